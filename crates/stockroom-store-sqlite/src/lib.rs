//! SQLite backend for the Stockroom inventory store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! connection thread without blocking the async runtime. Opening a store
//! brings its schema up to date with the [`migrate`] runner before any
//! inventory operation can run.

mod encode;
mod schema;
mod service;
mod store;

pub mod error;
pub mod migrate;

pub use error::{Error, ForeignKeyViolation, Result};
pub use migrate::MigrationReport;
pub use store::{DEFAULT_BUSY_TIMEOUT, SqliteStore, StoreConfig};
