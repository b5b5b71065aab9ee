//! Status ledger records - immutable facts, append-only

use super::OrderStatus;
use serde::{Deserialize, Serialize};

/// One entry in an order's status ledger.
///
/// Events are never updated or deleted. The order row's cached
/// `status` field is a projection of the newest entry; `sequence` is
/// a global monotonic counter that orders entries deterministically
/// even when two land in the same millisecond.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number - authoritative ordering, breaks
    /// timestamp ties
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Status the order entered with this event
    pub status: OrderStatus,
    /// Human-readable note ("Order confirmed - Cash on Delivery", ...)
    pub note: String,
    /// Actor that appended the event (user id or "system")
    pub created_by: String,
    /// Server timestamp (Unix milliseconds), set when the event is
    /// created
    pub timestamp: i64,
}

impl StatusEvent {
    pub fn new(
        sequence: u64,
        order_id: String,
        status: OrderStatus,
        note: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            status,
            note: note.into(),
            created_by: created_by.into(),
            timestamp: crate::util::now_millis(),
        }
    }
}
