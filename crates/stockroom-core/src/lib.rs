//! Core types and trait definitions for the Stockroom inventory ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::InventoryStore`]; the
//! [`ledger::MovementLedger`] drives every quantity change through it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod item;
pub mod ledger;
pub mod movement;
pub mod principal;
pub mod store;
pub mod transition;

pub use error::{Classify, Error, ErrorKind, Result};
pub use principal::Principal;
