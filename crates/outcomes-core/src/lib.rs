//! Core types and trait definitions for the academic-outcomes store.
//!
//! This crate is deliberately free of CSV and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod curriculum;
pub mod error;
pub mod import;
pub mod roster;
pub mod store;
pub mod summary;

pub use error::{Error, Result};
