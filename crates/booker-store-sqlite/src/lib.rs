//! SQLite backend for the event booker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every write primitive runs in
//! its own `BEGIN IMMEDIATE` transaction.
//!
//! SQLite has no row locks: `BEGIN IMMEDIATE` takes the database-wide write
//! lock, and the single connection runs one call at a time. Writes for
//! different events therefore serialise against each other, not only writes
//! for the same event.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
