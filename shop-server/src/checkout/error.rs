use thiserror::Error;
use tracing::error;

use shared::order::{CheckoutFailure, FailureCode, OrderStatus};

use crate::inventory::LockError;
use crate::ledger::LedgerError;
use crate::storage::StorageError;

/// Checkout engine errors.
///
/// Everything except `Storage` is a deterministic rejection of the
/// request; `LockContention` is the one case the caller should retry
/// with the same checkout id.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    #[error("Cart changed since last review")]
    CartChanged,

    #[error("Inventory rows are contended")]
    LockContention,

    #[error("Products unavailable: {0:?}")]
    ProductUnavailable(Vec<String>),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether re-submitting the same request can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockContention)
    }
}

impl From<LockError> for EngineError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Contention { .. } => EngineError::LockContention,
            LockError::ProductMissing(id) => EngineError::ProductUnavailable(vec![format!(
                "Product {id} is no longer available"
            )]),
            LockError::Storage(e) => EngineError::Storage(e),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderNotFound(id) => EngineError::OrderNotFound(id),
            LedgerError::InvalidTransition { from, to } => {
                EngineError::InvalidTransition { from, to }
            }
            LedgerError::Storage(e) => EngineError::Storage(e),
        }
    }
}

impl From<EngineError> for CheckoutFailure {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidCart(message) => {
                CheckoutFailure::new(FailureCode::InvalidCart, message)
            }
            EngineError::CartChanged => CheckoutFailure::new(
                FailureCode::CartChanged,
                "Your cart changed while you were checking out. Please review it and try again.",
            ),
            EngineError::LockContention => CheckoutFailure::new(
                FailureCode::LockContention,
                "The system is experiencing high load. Please try again in a moment.",
            ),
            EngineError::ProductUnavailable(details) => CheckoutFailure::with_details(
                FailureCode::ProductUnavailable,
                "Some items in your cart are unavailable",
                details,
            ),
            EngineError::OrderNotFound(id) => {
                CheckoutFailure::new(FailureCode::OrderNotFound, format!("Order not found: {id}"))
            }
            EngineError::InvalidTransition { from, to } => CheckoutFailure::new(
                FailureCode::InvalidTransition,
                format!("Cannot move order from {from} to {to}"),
            ),
            EngineError::Storage(e) => {
                // Internal detail stays in the log, not on the wire
                error!(error = %e, "Checkout failed on storage");
                CheckoutFailure::new(
                    FailureCode::PersistenceError,
                    "The system could not complete your order. Please try again.",
                )
            }
        }
    }
}
