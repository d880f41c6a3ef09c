//! SQLite backend for the phishdb record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The snapshot replacement runs entirely
//! on that thread inside one transaction, pulling records from the handoff
//! channel as they are decoded.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result, Stage};
pub use store::{DEFAULT_TABLE, SqliteStore};
