//! Inventory row locking with bounded retry
//!
//! A checkout must hold exclusive update locks on every product row
//! it touches before it reads stock or writes decrements. Locks are
//! requested in ascending product-id order, all-or-nothing, so two
//! overlapping checkouts can never deadlock on each other's partial
//! claims. When the set cannot be claimed, the manager sleeps and
//! retries up to the policy's attempt budget, then reports
//! contention to the caller as a retryable failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use shared::models::Product;

use crate::storage::{StorageError, StoreStorage};

/// Lock acquisition budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Sleep between attempts
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Could not lock inventory rows after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("Product {0} does not exist")]
    ProductMissing(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// RAII guard over a locked set of product rows.
///
/// Holds an authoritative snapshot of each locked product, read after
/// the locks were claimed. Dropping the guard releases the locks, so
/// an early return on any checkout error path cannot leak a claim.
#[derive(Debug)]
pub struct ProductLockGuard {
    storage: StoreStorage,
    product_ids: Vec<i64>,
    products: HashMap<i64, Product>,
}

impl ProductLockGuard {
    /// Snapshot of a locked product. Present for every id the guard
    /// was acquired with.
    pub fn product(&self, product_id: i64) -> Option<&Product> {
        self.products.get(&product_id)
    }

    pub fn products(&self) -> &HashMap<i64, Product> {
        &self.products
    }
}

impl Drop for ProductLockGuard {
    fn drop(&mut self) {
        self.storage.unlock_rows(&self.product_ids);
        debug!(rows = self.product_ids.len(), "Released inventory row locks");
    }
}

/// Claims product row locks for checkouts.
#[derive(Clone)]
pub struct InventoryLockManager {
    storage: StoreStorage,
    policy: RetryPolicy,
}

impl InventoryLockManager {
    pub fn new(storage: StoreStorage, policy: RetryPolicy) -> Self {
        Self { storage, policy }
    }

    /// Lock the given product rows and snapshot them.
    ///
    /// Ids are deduplicated and sorted ascending before claiming.
    /// Every requested id must exist in the catalog; a missing row is
    /// a hard error, not contention.
    pub async fn lock_products(&self, product_ids: &[i64]) -> Result<ProductLockGuard, LockError> {
        let mut ids: Vec<i64> = product_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut attempts = 0;
        loop {
            attempts += 1;
            if self.storage.try_lock_rows(&ids) {
                debug!(rows = ids.len(), attempts, "Acquired inventory row locks");
                break;
            }
            if attempts >= self.policy.max_attempts {
                warn!(
                    rows = ids.len(),
                    attempts, "Inventory row locks still contended, giving up"
                );
                return Err(LockError::Contention { attempts });
            }
            tokio::time::sleep(self.policy.retry_delay).await;
        }

        // Snapshot after claiming: no other checkout can change these
        // rows until the guard drops.
        let products = match self.storage.get_products(&ids) {
            Ok(products) => products,
            Err(e) => {
                self.storage.unlock_rows(&ids);
                return Err(e.into());
            }
        };
        if let Some(missing) = ids.iter().find(|id| !products.contains_key(id)) {
            let missing = *missing;
            self.storage.unlock_rows(&ids);
            return Err(LockError::ProductMissing(missing));
        }

        Ok(ProductLockGuard {
            storage: self.storage.clone(),
            product_ids: ids,
            products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn seeded_storage() -> StoreStorage {
        let storage = StoreStorage::open_in_memory().unwrap();
        for id in 1..=3 {
            let product = Product::new(id, format!("Product {id}"), Decimal::new(999, 2), 10);
            storage.upsert_product(&product).unwrap();
        }
        storage
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_guard_snapshots_and_releases() {
        let storage = seeded_storage();
        let manager = InventoryLockManager::new(storage.clone(), fast_policy());

        {
            let guard = manager.lock_products(&[2, 1, 1]).await.unwrap();
            assert_eq!(guard.products().len(), 2);
            assert_eq!(guard.product(1).unwrap().stock, 10);
            // Held rows are claimed, unrelated rows are not
            assert!(!storage.try_lock_rows(&[1]));
            assert!(storage.try_lock_rows(&[3]));
            storage.unlock_rows(&[3]);
        }

        // Guard dropped: rows are free again
        assert!(storage.try_lock_rows(&[1, 2]));
    }

    #[tokio::test]
    async fn test_contention_reported_after_budget() {
        let storage = seeded_storage();
        let manager = InventoryLockManager::new(storage.clone(), fast_policy());

        assert!(storage.try_lock_rows(&[2]));
        let err = manager.lock_products(&[1, 2]).await.unwrap_err();
        match err {
            LockError::Contention { attempts } => assert_eq!(attempts, 3),
            other => panic!("expected contention, got {other:?}"),
        }
        // Failed acquisition must not leave row 1 claimed
        assert!(storage.try_lock_rows(&[1]));
    }

    #[tokio::test]
    async fn test_retry_succeeds_once_rows_free_up() {
        let storage = seeded_storage();
        let manager = InventoryLockManager::new(storage.clone(), fast_policy());

        assert!(storage.try_lock_rows(&[1]));
        let release = {
            let storage = storage.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(8)).await;
                storage.unlock_rows(&[1]);
            })
        };

        let guard = manager.lock_products(&[1]).await.unwrap();
        assert_eq!(guard.product(1).unwrap().id, 1);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_product_is_a_hard_error() {
        let storage = seeded_storage();
        let manager = InventoryLockManager::new(storage.clone(), fast_policy());

        let err = manager.lock_products(&[1, 99]).await.unwrap_err();
        assert!(matches!(err, LockError::ProductMissing(99)));
        // Rows must have been released on the error path
        assert!(storage.try_lock_rows(&[1]));
    }
}
