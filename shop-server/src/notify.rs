//! Post-commit notifications
//!
//! Notifications are strictly best-effort and strictly post-commit.
//! The engine dispatches them only after the transaction that created
//! or transitioned an order has committed, and a delivery failure is
//! logged, never surfaced to the caller or rolled back into storage.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use shared::order::{Order, OrderStatus};

/// Events dispatched after a successful commit.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// An order was created
    OrderPlaced { order: Order },
    /// An order's status changed
    StatusChanged {
        order: Order,
        status: OrderStatus,
        note: String,
    },
}

impl NotificationEvent {
    pub fn order_id(&self) -> &str {
        match self {
            NotificationEvent::OrderPlaced { order } => &order.id,
            NotificationEvent::StatusChanged { order, .. } => &order.id,
        }
    }
}

#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification channel (email, push, webhook, ...).
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Default sink that writes notifications to the log stream.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationPort for LoggingNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        match &event {
            NotificationEvent::OrderPlaced { order } => {
                info!(
                    order_id = %order.id,
                    tracking_number = %order.tracking_number,
                    email = %order.contact.email,
                    total = %order.total_amount,
                    "Order confirmation sent"
                );
            }
            NotificationEvent::StatusChanged { order, status, note } => {
                info!(
                    order_id = %order.id,
                    status = %status,
                    note = %note,
                    "Status update sent"
                );
            }
        }
        Ok(())
    }
}
