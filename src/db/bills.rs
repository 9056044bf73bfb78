use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Error as SqlError, ErrorCode};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::connection::Store;
use super::error::StoreError;
use crate::models::Bill;

impl Store {
    /// Insert a new bill row and return its auto-assigned id. The customer
    /// reference is deliberately not pre-checked here: SQLite's foreign-key
    /// constraint is the single enforcement point, and a dangling id comes
    /// back as [`StoreError::Constraint`].
    ///
    /// The items blob is bound verbatim; the store never parses it.
    pub fn add_bill(
        &self,
        customer_id: i64,
        bill_date: NaiveDate,
        total_amount: Decimal,
        items: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bills (customer_id, bill_date, total_amount, items)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                customer_id,
                bill_date,
                // The column is DECIMAL(10, 2); rescale before the lossy
                // numeric bind so stored and returned values agree.
                total_amount.round_dp(2).to_f64(),
                items
            ],
        )
        .map_err(map_reference_constraint)?;
        Ok(conn.last_insert_rowid())
    }

    /// Retrieve every bill joined with its customer's name, in natural
    /// storage order. A bill whose customer vanished would be dropped by
    /// the inner join, but nothing in this system deletes customers.
    pub fn all_bills(&self) -> Result<Vec<Bill>, StoreError> {
        let mut stmt = self.conn()?.prepare(
            "SELECT b.id, c.name, b.bill_date, b.total_amount, b.items
             FROM bills b
             INNER JOIN customers c ON b.customer_id = c.id",
        )?;

        let bills = stmt
            .query_map([], |row| {
                let total: f64 = row.get(3)?;
                let mut total = Decimal::from_f64(total).ok_or_else(|| {
                    SqlError::FromSqlConversionFailure(
                        3,
                        Type::Real,
                        "total amount is not a representable decimal".into(),
                    )
                })?;
                // Restore the column's two-digit scale after the numeric
                // round trip, so 10.5 reads back as 10.50.
                total.rescale(2);

                Ok(Bill {
                    id: row.get(0)?,
                    customer: row.get(1)?,
                    bill_date: row.get(2)?,
                    total,
                    items: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(bills)
    }
}

/// Coerce SQLite constraint errors into a human-readable message. The only
/// constraint a bill insert can trip is the customer foreign key.
fn map_reference_constraint(err: SqlError) -> StoreError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        StoreError::Constraint("Bill refers to a customer that does not exist.".to_string())
    } else {
        StoreError::Sqlite(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn bill_requires_existing_customer() {
        let store = Store::open_in_memory().unwrap();

        let result = store.add_bill(42, date("2024-01-01"), Decimal::new(1299, 2), "Pen:2:1.50");
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        // The rejected bill must not leak into the read side.
        assert!(store.all_bills().unwrap().is_empty());
    }

    #[test]
    fn bill_round_trips_through_the_join() {
        let store = Store::open_in_memory().unwrap();
        let customer_id = store
            .add_customer("Alice", Some("a@x.com"), Some("555-1234"), Some("1 Main St"))
            .unwrap();
        assert_eq!(customer_id, 1);

        let bill_id = store
            .add_bill(
                customer_id,
                date("2024-01-01"),
                Decimal::new(1299, 2),
                "Pen:2:1.50,Book:1:9.99",
            )
            .unwrap();
        assert_eq!(bill_id, 1);

        let bills = store.all_bills().unwrap();
        assert_eq!(bills.len(), 1);
        let bill = &bills[0];
        assert_eq!(bill.id, 1);
        assert_eq!(bill.customer, "Alice");
        assert_eq!(bill.bill_date, date("2024-01-01"));
        assert_eq!(bill.total, Decimal::new(1299, 2));
        // The items blob comes back byte-identical.
        assert_eq!(bill.items, "Pen:2:1.50,Book:1:9.99");
    }

    #[test]
    fn several_bills_can_reference_one_customer() {
        let store = Store::open_in_memory().unwrap();
        let customer_id = store.add_customer("Alice", None, None, None).unwrap();

        let first = store
            .add_bill(customer_id, date("2024-01-01"), Decimal::new(500, 2), "Pen:1:5.00")
            .unwrap();
        let second = store
            .add_bill(customer_id, date("2024-02-01"), Decimal::new(999, 2), "Book:1:9.99")
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let bills = store.all_bills().unwrap();
        assert_eq!(bills.len(), 2);
        assert!(bills.iter().all(|bill| bill.customer == "Alice"));
    }

    #[test]
    fn totals_keep_two_digit_precision() {
        let store = Store::open_in_memory().unwrap();
        let customer_id = store.add_customer("Alice", None, None, None).unwrap();
        store
            .add_bill(customer_id, date("2024-01-01"), Decimal::new(1050, 2), "Pen:7:1.50")
            .unwrap();

        let bills = store.all_bills().unwrap();
        assert_eq!(bills[0].total, Decimal::new(1050, 2));
        assert_eq!(bills[0].total.to_string(), "10.50");
    }
}
