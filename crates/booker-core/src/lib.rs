//! Core types and trait definitions for the event booker.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. Storage backends implement the traits in [`store`]; the
//! lifecycle engine consumes them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod booking;
pub mod error;
pub mod event;
pub mod notify;
pub mod store;
pub mod ttl;
pub mod user;

pub use error::{Error, ErrorKind, Result};
