//! Order domain: status machine, ledger events, and checkout wire types

pub mod event;
pub mod status;
pub mod types;

// Re-exports
pub use event::StatusEvent;
pub use status::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod, UnknownMethod};
pub use types::{
    CheckoutFailure, CheckoutRequest, ContactInfo, FailureCode, Order, OrderItem, OrderTracking,
};
