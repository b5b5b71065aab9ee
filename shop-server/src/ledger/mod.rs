//! Append-only status ledger
//!
//! Every status an order has ever held lives in the ledger; the
//! order row's `status` field is only a cached projection of the
//! newest entry. Both writes happen in the same transaction, through
//! [`append_status_txn`], which is the single code path that mutates
//! an order's status. Checkout uses it inside the order-creation
//! transaction; every later transition goes through
//! [`StatusLedger::append_status_event`].

use std::sync::Arc;

use redb::WriteTransaction;
use thiserror::Error;
use tracing::{info, warn};

use shared::order::{Order, OrderStatus, OrderTracking, StatusEvent};

use crate::notify::{NotificationEvent, NotificationPort};
use crate::storage::{StorageError, StoreStorage};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Append a status event and refresh the order's cached projection,
/// inside the caller's transaction.
///
/// Validates the transition, allocates the next global sequence,
/// writes the event, stamps `shipped_date`/`delivered_date` the first
/// time those statuses are reached (a repeated append never resets
/// them), and persists the updated order row.
pub(crate) fn append_status_txn(
    storage: &StoreStorage,
    txn: &WriteTransaction,
    order: &mut Order,
    status: OrderStatus,
    note: impl Into<String>,
    created_by: impl Into<String>,
) -> Result<StatusEvent, LedgerError> {
    if !order.status.can_transition_to(status) {
        return Err(LedgerError::InvalidTransition {
            from: order.status,
            to: status,
        });
    }

    let sequence = storage.next_sequence_txn(txn)?;
    let event = StatusEvent::new(sequence, order.id.clone(), status, note, created_by);
    storage.append_event_txn(txn, &event)?;

    match status {
        OrderStatus::Shipped if order.shipped_date.is_none() => {
            order.shipped_date = Some(event.timestamp);
        }
        OrderStatus::Delivered if order.delivered_date.is_none() => {
            order.delivered_date = Some(event.timestamp);
        }
        _ => {}
    }

    order.status = status;
    storage.put_order_txn(txn, order)?;

    Ok(event)
}

/// Status transitions and tracking lookups over committed orders.
pub struct StatusLedger {
    storage: StoreStorage,
    notifier: Arc<dyn NotificationPort>,
}

impl StatusLedger {
    pub fn new(storage: StoreStorage, notifier: Arc<dyn NotificationPort>) -> Self {
        Self { storage, notifier }
    }

    /// Transition an order to a new status and return the refreshed
    /// order.
    ///
    /// The event and the refreshed order row commit atomically; the
    /// status-changed notification goes out only after the commit and
    /// its failure is logged, not propagated.
    pub async fn append_status_event(
        &self,
        order_id: &str,
        status: OrderStatus,
        note: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<Order, LedgerError> {
        let note = note.into();

        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let event = append_status_txn(&self.storage, &txn, &mut order, status, &note, created_by)?;
        txn.commit().map_err(StorageError::from)?;

        info!(
            order_id = %order_id,
            status = %status,
            sequence = event.sequence,
            "Order status updated"
        );

        if let Err(e) = self
            .notifier
            .notify(NotificationEvent::StatusChanged {
                order: order.clone(),
                status,
                note,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Status notification failed");
        }

        Ok(order)
    }

    /// Customer-facing tracking view: order, full history newest
    /// first, and the progress percentage of the current status.
    ///
    /// The query matches a tracking number first, then falls back to
    /// the internal order id.
    pub fn track_order(&self, query: &str) -> Result<OrderTracking, LedgerError> {
        let found = match self.storage.find_order_by_tracking(query)? {
            Some(order) => Some(order),
            None => self.storage.get_order(query)?,
        };
        let order = found.ok_or_else(|| LedgerError::OrderNotFound(query.to_string()))?;

        let mut history = self.storage.get_status_history(&order.id)?;
        history.reverse();

        let progress_percent = order.status.progress_percent();
        Ok(OrderTracking {
            order,
            history,
            progress_percent,
        })
    }
}
