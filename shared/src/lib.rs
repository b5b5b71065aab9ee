//! Shared domain types for the shop checkout core
//!
//! Common types used by the fulfillment engine and its callers:
//! catalog products, the session cart, order rows, the status ledger
//! and the checkout wire types.

pub mod cart;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
