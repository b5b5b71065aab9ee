//! Order rows and checkout wire types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod, StatusEvent, UnknownMethod};
use crate::cart::Cart;

/// Shipping and contact details captured at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub order_notes: String,
}

/// Durable order row.
///
/// Created atomically with its items and first ledger entries at
/// checkout commit; never deleted, only status-transitioned.
/// Invariant: `total_amount == subtotal + shipping_cost + tax`
/// exactly, at two decimal places.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Internal order id (UUID string)
    pub id: String,
    pub user_id: i64,
    pub contact: ContactInfo,

    // Financial fields (fixed-point)
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,

    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,

    /// Externally shareable identifier, globally unique, immutable
    /// once set.
    pub tracking_number: String,
    pub estimated_delivery: NaiveDate,

    /// Cached projection of the latest status ledger entry. Written
    /// only by ledger appends, in the same transaction as the event.
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,

    // Timestamps (Unix milliseconds)
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<i64>,
    /// Set once, when the order first enters `shipped`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_date: Option<i64>,
    /// Set once, when the order first enters `delivered`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_date: Option<i64>,
}

/// Order line item, bulk-created once at checkout, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: i64,
    /// Name snapshot for receipts and reports.
    pub product_name: String,
    /// Unit price snapshot carried over from the cart line.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// One checkout attempt.
///
/// `checkout_id` makes retries idempotent: resubmitting the same id
/// after a transient failure can only ever create one order, and a
/// duplicate submission returns the originally created order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub checkout_id: String,
    pub user_id: i64,
    pub cart: Cart,
    /// Cart version the user last reviewed; a mismatch means the
    /// cart was edited concurrently and the checkout aborts.
    pub cart_version: u64,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    pub contact: ContactInfo,
}

impl CheckoutRequest {
    /// Build a request from a reviewed cart, pinning its current
    /// version and generating a fresh idempotency id.
    pub fn new(
        user_id: i64,
        cart: Cart,
        shipping_method: ShippingMethod,
        payment_method: PaymentMethod,
        contact: ContactInfo,
    ) -> Self {
        let cart_version = cart.version();
        Self {
            checkout_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            cart,
            cart_version,
            shipping_method,
            payment_method,
            contact,
        }
    }
}

/// Tracking projection returned to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTracking {
    pub order: Order,
    /// Ledger entries, newest first.
    pub history: Vec<StatusEvent>,
    /// Fixed status → percent mapping; negative for terminal
    /// non-success states.
    pub progress_percent: i32,
}

/// Failure codes crossing the engine boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    InvalidCart,
    CartChanged,
    LockContention,
    ProductUnavailable,
    InvalidMethod,
    OrderNotFound,
    InvalidTransition,
    PersistenceError,
}

/// Wire-level checkout failure: a code, a user-facing message, and
/// per-line details (one entry per offending product for
/// `PRODUCT_UNAVAILABLE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutFailure {
    pub code: FailureCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckoutFailure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: vec![],
        }
    }

    pub fn with_details(
        code: FailureCode,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    /// Transient failures may be re-issued with the same
    /// `checkout_id` after a short delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, FailureCode::LockContention)
    }
}

impl From<UnknownMethod> for CheckoutFailure {
    fn from(e: UnknownMethod) -> Self {
        CheckoutFailure::new(FailureCode::InvalidMethod, e.to_string())
    }
}
