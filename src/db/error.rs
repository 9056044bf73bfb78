use std::io;

use thiserror::Error;

/// Failures surfaced by the persistence layer. Every operation returns an
/// explicit `Result` so an empty row set is never conflated with an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation attempted after a failed initialization or after `close`.
    /// The store never retries; callers report the failure and carry on.
    #[error("no database connection")]
    Disconnected,

    /// SQLite rejected a write that violates the schema's constraints. The
    /// message is already phrased for the status footer.
    #[error("{0}")]
    Constraint(String),

    /// The user's home directory could not be located, so there is nowhere
    /// to keep the database file.
    #[error("could not locate home directory")]
    NoHomeDir,

    /// The application data directory could not be created.
    #[error("failed to create data directory")]
    DataDir(#[source] io::Error),

    /// Any other SQLite-level failure (unreachable file, corrupt store,
    /// failed statement).
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
