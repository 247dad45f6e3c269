//! SQLite backend for the academic-outcomes store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The engines themselves (ingestion,
//! replication, clear) are synchronous functions over a
//! [`rusqlite::Connection`] that own their transaction boundaries.

mod clear;
mod encode;
mod ingest;
mod replicate;
mod resolver;
mod schema;
mod sequence;
mod store;
mod terms;

pub mod error;

pub use error::{Error, Result};
pub use ingest::DEFAULT_INSTITUTION;
pub use replicate::replicated_crn;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
