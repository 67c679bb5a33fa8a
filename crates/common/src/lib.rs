//! Shared identifier types for the order fulfillment engine.

pub mod types;

pub use types::{BookId, OrderId, UserId};
