use rusqlite::params;

use super::connection::Store;
use super::error::StoreError;
use crate::models::{Customer, CustomerName};

impl Store {
    /// Insert a new customer row and return its auto-assigned id. There is
    /// no uniqueness constraint on name or email; duplicates are allowed by
    /// design and the form layer owns any required-field checks.
    pub fn add_customer(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO customers (name, email, phone, address)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, email, phone, address],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Retrieve every customer in natural storage order. Ordering is
    /// whatever the engine returns; callers must not rely on it.
    pub fn all_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut stmt = self
            .conn()?
            .prepare("SELECT id, name, email, phone, address FROM customers")?;

        let customers = stmt
            .query_map([], |row| {
                Ok(Customer {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    address: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(customers)
    }

    /// Lightweight (id, name) projection that feeds the bill form's
    /// customer selector.
    pub fn customer_names(&self) -> Result<Vec<CustomerName>, StoreError> {
        let mut stmt = self.conn()?.prepare("SELECT id, name FROM customers")?;

        let names = stmt
            .query_map([], |row| {
                Ok(CustomerName {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_and_rows_appear() {
        let store = Store::open_in_memory().unwrap();

        let first = store
            .add_customer("Alice", Some("a@x.com"), Some("555-1234"), Some("1 Main St"))
            .unwrap();
        let second = store.add_customer("Bob", None, None, None).unwrap();
        let third = store.add_customer("Alice", None, None, None).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        // Duplicate names are allowed and still get a fresh identity.
        assert_eq!(third, 3);

        let customers = store.all_customers().unwrap();
        assert_eq!(customers.len(), 3);
        assert!(customers.iter().any(|c| c.id == first && c.name == "Alice"));
    }

    #[test]
    fn optional_fields_round_trip_as_null() {
        let store = Store::open_in_memory().unwrap();
        store
            .add_customer("Bob", None, Some("555-0000"), None)
            .unwrap();

        let customers = store.all_customers().unwrap();
        assert_eq!(customers.len(), 1);
        let bob = &customers[0];
        assert_eq!(bob.email, None);
        assert_eq!(bob.phone.as_deref(), Some("555-0000"));
        assert_eq!(bob.address, None);
    }

    #[test]
    fn name_projection_matches_full_rows() {
        let store = Store::open_in_memory().unwrap();
        let alice = store
            .add_customer("Alice", Some("a@x.com"), None, None)
            .unwrap();
        let bob = store.add_customer("Bob", None, None, None).unwrap();

        let names = store.customer_names().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.id == alice && n.name == "Alice"));
        assert!(names.iter().any(|n| n.id == bob && n.name == "Bob"));
    }
}
