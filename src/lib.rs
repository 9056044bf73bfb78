//! Core library surface for the billing desk TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as potential external tooling can reuse the same
//! pieces: the SQLite-backed store, the domain models, and the interactive
//! front-end.
pub mod db;
pub mod models;
pub mod ui;

/// Convenience re-exports for the persistence layer.
pub use db::{Store, StoreError};

/// The domain types that other layers manipulate.
pub use models::{Bill, Customer, CustomerName};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
