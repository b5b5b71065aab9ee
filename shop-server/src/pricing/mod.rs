//! Checkout pricing
//!
//! Pure money math - no I/O, no storage access. The calculator is the
//! single place that knows the shipping rate table, the tax rate, and
//! the delivery-offset table.

mod calculator;

pub use calculator::{OrderTotals, compute_totals, delivery_offset_days, shipping_cost};
