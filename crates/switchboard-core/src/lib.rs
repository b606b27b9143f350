//! Core types and the call-session state machine for Switchboard.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! key-value store, language model, and speech synthesizer are reached only
//! through the traits in [`store`] and [`provider`]; concrete backends live in
//! sibling crates and test doubles can stand in for all of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod action;
pub mod analytics;
pub mod audio;
pub mod controller;
pub mod engine;
pub mod error;
pub mod finalizer;
pub mod memory;
pub mod policy;
pub mod provider;
pub mod session;
pub mod store;
pub mod tenant;

pub use action::NextAction;
pub use engine::Switchboard;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
