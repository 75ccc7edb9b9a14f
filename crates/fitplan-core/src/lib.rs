//! Core types and trait definitions for the fitplan workout tracker.
//!
//! This crate holds the backend row shapes, the view models screens consume,
//! the pure row mapper between them, input validation, and the [`Backend`]
//! trait that storage implementations provide. It performs no I/O itself.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod error;
pub mod link;
pub mod mapper;
pub mod plan;
pub mod profile;
pub mod row;
pub mod store;
pub mod validate;

pub use error::{Error, Result, ValidationError};
pub use store::Backend;
