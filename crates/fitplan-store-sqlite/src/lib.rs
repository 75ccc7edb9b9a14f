//! SQLite backend for fitplan.
//!
//! Implements [`fitplan_core::Backend`] on top of [`tokio_rusqlite`] so all
//! database access runs on a dedicated thread without blocking the async
//! runtime. The same database holds the auth tables, the relational data, and
//! the client-side key/value slot where the signed-in session is persisted.

mod backend;
mod encode;
mod schema;
mod secret;

pub mod error;

pub use backend::SqliteBackend;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
