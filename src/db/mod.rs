//! Persistence module split across logical submodules. The [`Store`] value
//! owns the single SQLite connection and exposes parameterized create and
//! read operations for the two entities; raw user input never reaches a
//! query string.

mod bills;
mod connection;
mod customers;
mod error;

pub use connection::Store;
pub use error::StoreError;
