//! Checkout and order fulfillment core
//!
//! Turns a session cart into a durable order without overselling
//! stock and without surviving partial failures:
//!
//! - **pricing**: pure fixed-point totals calculator
//! - **inventory**: row-level product locking with bounded retry
//! - **checkout**: the fulfillment engine - one atomic unit of work
//!   from validation to the first status events
//! - **ledger**: append-only status history; the only writer of an
//!   order's cached status
//! - **storage**: redb-backed transactional store
//! - **notify**: post-commit, best-effort notification port
//!
//! # Checkout Flow
//!
//! ```text
//! checkout(request)
//!     ├─ 1. Precondition checks (cart, contact, cart version)
//!     ├─ 2. Idempotency check (checkout_id)
//!     ├─ 3. Lock product rows (ascending id, bounded retry)
//!     ├─ 4. Begin write transaction
//!     ├─ 5. Re-validate availability against locked snapshots
//!     ├─ 6. Compute totals, create order + items, decrement stock
//!     ├─ 7. Append PENDING + target status events
//!     ├─ 8. Commit transaction, release locks
//!     └─ 9. Notify (best-effort, never unwinds the order)
//! ```

pub mod checkout;
pub mod common;
pub mod config;
pub mod inventory;
pub mod ledger;
pub mod notify;
pub mod pricing;
pub mod storage;

// Re-exports
pub use checkout::{CheckoutEngine, EngineError, EngineResult};
pub use config::Config;
pub use inventory::{InventoryLockManager, LockError, ProductLockGuard, RetryPolicy};
pub use ledger::{LedgerError, StatusLedger};
pub use notify::{LoggingNotifier, NotificationEvent, NotificationPort, NotifyError};
pub use storage::{StorageError, StorageResult, StoreStorage};
