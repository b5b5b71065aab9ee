//! Status enums and the order state machine
//!
//! `OrderStatus` doubles as the state machine: `can_transition_to`
//! is the single definition of which ledger appends are legal, and
//! `progress_percent` is the fixed customer-facing progress mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order lifecycle status.
///
/// The order row carries this as a cache of the newest status ledger
/// entry; it is never written outside a ledger append.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentFailed,
    Processing,
    Confirmed,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether a ledger append may move an order from `self` to `next`.
    ///
    /// Re-appending the current status of a non-terminal order is
    /// allowed: it records an extra ledger entry without changing the
    /// projection (and without resetting derived timestamps).
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if self == next {
            return !self.is_terminal();
        }
        if self.is_terminal() {
            return false;
        }
        // Cancellation and refund are reachable from any non-terminal state.
        if matches!(next, Cancelled | Refunded) {
            return true;
        }
        matches!(
            (self, next),
            (Pending, PaymentFailed)
                | (Pending, Processing)
                | (Pending, Confirmed)
                | (PaymentFailed, Processing)
                | (PaymentFailed, Confirmed)
                | (Processing, Shipped)
                | (Confirmed, Shipped)
                | (Shipped, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    /// Customer-facing completion percentage. Negative means the
    /// order terminated without success (no progress bar).
    pub fn progress_percent(self) -> i32 {
        match self {
            Self::Pending | Self::PaymentFailed => 0,
            Self::Processing => 20,
            Self::Confirmed => 40,
            Self::Shipped => 60,
            Self::OutForDelivery => 80,
            Self::Delivered => 100,
            Self::Cancelled | Self::Refunded => -1,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::PaymentFailed => write!(f, "PAYMENT_FAILED"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Confirmed => write!(f, "CONFIRMED"),
            OrderStatus::Shipped => write!(f, "SHIPPED"),
            OrderStatus::OutForDelivery => write!(f, "OUT_FOR_DELIVERY"),
            OrderStatus::Delivered => write!(f, "DELIVERED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// Payment lifecycle status, tracked separately from order status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// Shipping method selected at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Pickup,
}

/// Payment method selected at checkout.
///
/// Only `CashOnDelivery` changes engine behavior; the rest are
/// simulated as immediately approved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    #[default]
    CashOnDelivery,
    Upi,
    NetBanking,
}

/// Error for method strings arriving from the outer surface (HTTP
/// forms and the like). Rejected before the engine is reached.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} method: {value}")]
pub struct UnknownMethod {
    pub kind: &'static str,
    pub value: String,
}

impl std::str::FromStr for ShippingMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            "pickup" => Ok(Self::Pickup),
            _ => Err(UnknownMethod {
                kind: "shipping",
                value: s.to_string(),
            }),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "upi" => Ok(Self::Upi),
            "net_banking" => Ok(Self::NetBanking),
            _ => Err(UnknownMethod {
                kind: "payment",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_forward_fulfillment_chain() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));

        // No skipping ahead
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Confirmed.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn test_cancel_and_refund_from_any_non_terminal() {
        use OrderStatus::*;
        for status in [
            Pending,
            PaymentFailed,
            Processing,
            Confirmed,
            Shipped,
            OutForDelivery,
        ] {
            assert!(status.can_transition_to(Cancelled), "{status} -> cancelled");
            assert!(status.can_transition_to(Refunded), "{status} -> refunded");
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        use OrderStatus::*;
        for terminal in [Delivered, Cancelled, Refunded] {
            assert!(terminal.is_terminal());
            for next in [Pending, Processing, Shipped, Cancelled, terminal] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_reappend_same_status_allowed_while_active() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_progress_mapping() {
        use OrderStatus::*;
        assert_eq!(Pending.progress_percent(), 0);
        assert_eq!(Processing.progress_percent(), 20);
        assert_eq!(Confirmed.progress_percent(), 40);
        assert_eq!(Shipped.progress_percent(), 60);
        assert_eq!(OutForDelivery.progress_percent(), 80);
        assert_eq!(Delivered.progress_percent(), 100);
        assert_eq!(Cancelled.progress_percent(), -1);
        assert_eq!(Refunded.progress_percent(), -1);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            ShippingMethod::from_str("express"),
            Ok(ShippingMethod::Express)
        );
        assert_eq!(
            PaymentMethod::from_str("cash_on_delivery"),
            Ok(PaymentMethod::CashOnDelivery)
        );
        assert!(ShippingMethod::from_str("drone").is_err());
        assert!(PaymentMethod::from_str("barter").is_err());
    }
}
