//! SQLite backend for the Safetrail fallback channel.
//!
//! Persists the shared alert list and the single-slot mailboxes as rows of a
//! flat key-value table. Wraps [`tokio_rusqlite`] so all database access runs
//! on a dedicated thread without blocking the async runtime. Several
//! processes on one machine can open the same file; that file is the shared
//! medium the dashboards poll.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteKvStore;
