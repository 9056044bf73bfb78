use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use rusqlite::Connection;

use super::error::StoreError;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".billing-desk";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "billing.sqlite";

/// Owner of the single database connection. The store moves through an
/// explicit lifecycle: `initialize` yields a connected store, `close` (or a
/// failed initialization) leaves it disconnected, and once disconnected
/// every operation reports [`StoreError::Disconnected`] without touching
/// SQLite. There is no reconnection path.
pub struct Store {
    conn: Option<Connection>,
}

impl Store {
    /// Open the database file, creating the data directory and the file if
    /// absent, run the idempotent schema setup, and return a connected
    /// store. The caller is expected to treat a failure as reportable, not
    /// fatal: construct [`Store::disconnected`] and keep the process alive.
    pub fn initialize() -> Result<Self, StoreError> {
        let db_path = db_path()?;

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::DataDir)?;
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn)
    }

    /// The terminal fallback state: a store with no connection. All
    /// operations on it fail with [`StoreError::Disconnected`].
    pub fn disconnected() -> Self {
        Self { conn: None }
    }

    /// Whether a live connection is held. The UI uses this only for the
    /// startup status line; operations carry their own disconnected checks.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Release the connection. Safe to call repeatedly; every operation
    /// after the first call behaves as if the store were disconnected.
    pub fn close(&mut self) {
        self.conn = None;
    }

    /// Build a connected store around an already-open connection. Also
    /// toggles `PRAGMA foreign_keys = ON` so the referential integrity
    /// checks in our schema behave the same during tests and production
    /// runs.
    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        ensure_schema(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Borrow the live connection or report the disconnected state. Every
    /// operation funnels through this check.
    pub(crate) fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Disconnected)
    }

    /// Connected store over an in-memory database, for tests.
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

/// Create the `customers` and `bills` tables if they do not exist yet.
/// Running this against an already-populated database is a no-op.
fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            address TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            bill_date DATE NOT NULL,
            total_amount DECIMAL(10, 2) NOT NULL,
            items TEXT NOT NULL,
            FOREIGN KEY(customer_id) REFERENCES customers(id)
        )",
        [],
    )?;

    Ok(())
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn db_path() -> Result<PathBuf, StoreError> {
    let base_dirs = BaseDirs::new().ok_or(StoreError::NoHomeDir)?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn schema_setup_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_customer("Ada", None, None, None).unwrap();

        // A second pass over the DDL must neither duplicate tables nor
        // drop the row inserted between the two passes.
        ensure_schema(store.conn().unwrap()).unwrap();

        assert_eq!(table_names(store.conn().unwrap()), ["bills", "customers"]);
        let customers = store.all_customers().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].id, id);
    }

    #[test]
    fn disconnected_store_rejects_every_operation() {
        let store = Store::disconnected();
        assert!(!store.is_connected());
        assert!(matches!(
            store.all_customers(),
            Err(StoreError::Disconnected)
        ));
        assert!(matches!(
            store.add_customer("Ada", None, None, None),
            Err(StoreError::Disconnected)
        ));
        assert!(matches!(store.all_bills(), Err(StoreError::Disconnected)));
        assert!(matches!(
            store.customer_names(),
            Err(StoreError::Disconnected)
        ));
    }

    #[test]
    fn close_is_terminal_and_repeatable() {
        let mut store = Store::open_in_memory().unwrap();
        store.add_customer("Ada", None, None, None).unwrap();

        store.close();
        store.close();

        assert!(!store.is_connected());
        assert!(matches!(
            store.all_customers(),
            Err(StoreError::Disconnected)
        ));
    }
}
