//! redb-based storage for products, orders, and the status ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalog rows (stock + availability) |
//! | `orders` | `order_id` | `Order` | Order rows |
//! | `order_items` | `order_id` | `Vec<OrderItem>` | Line items, bulk-written once |
//! | `status_events` | `(order_id, sequence)` | `StatusEvent` | Status ledger (append-only) |
//! | `tracking_index` | `tracking_number` | `order_id` | Tracking-number uniqueness + lookup |
//! | `processed_checkouts` | `checkout_id` | `order_id` | Idempotency check |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//!
//! # Atomicity
//!
//! The whole checkout unit of work (order row, items, stock
//! decrements, two status events, idempotency marker) shares one
//! write transaction. Dropping the transaction without committing
//! rolls everything back; redb keeps the file consistent across
//! crashes.
//!
//! # Row locking
//!
//! "Select for update" is an explicit capability here: the store
//! keeps a registry of product rows claimed by in-flight checkouts.
//! [`StoreStorage::try_lock_rows`] claims a whole set atomically or
//! not at all, so overlapping checkouts can never hold partial,
//! circular claims.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use thiserror::Error;

use shared::models::Product;
use shared::order::{Order, OrderItem, StatusEvent};

/// Table for products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for order items: key = order_id, value = JSON-serialized Vec<OrderItem>
const ORDER_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_items");

/// Table for the status ledger: key = (order_id, sequence), value = JSON-serialized StatusEvent
const STATUS_EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("status_events");

/// Table for tracking-number lookup: key = tracking_number, value = order_id
const TRACKING_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tracking_index");

/// Table for processed checkouts: key = checkout_id, value = order_id (idempotency)
const PROCESSED_CHECKOUTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_checkouts");

/// Table for the sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Store backed by redb, plus the in-flight row-lock registry.
#[derive(Clone)]
pub struct StoreStorage {
    db: Arc<Database>,
    /// Product rows currently locked for update by an in-flight
    /// checkout.
    row_locks: Arc<Mutex<HashSet<i64>>>,
}

impl std::fmt::Debug for StoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreStorage")
            .field("db", &"<redb::Database>")
            .finish()
    }
}

impl StoreStorage {
    /// Open or create the database at the given path.
    ///
    /// Commits are durable as soon as `commit()` returns; redb's
    /// copy-on-write design keeps the file consistent even across
    /// power loss mid-transaction.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory database (tests and demos).
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(STATUS_EVENTS_TABLE)?;
            let _ = write_txn.open_table(TRACKING_INDEX_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_CHECKOUTS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            row_locks: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Row Locking ==========

    /// Claim exclusive update locks on a set of product rows.
    ///
    /// All-or-nothing: if any row is already claimed, nothing is
    /// taken and the caller must retry. Callers pass ids in
    /// ascending order (the lock manager sorts), keeping the request
    /// order canonical across concurrent checkouts.
    pub fn try_lock_rows(&self, product_ids: &[i64]) -> bool {
        let mut locks = self.row_locks.lock();
        if product_ids.iter().any(|id| locks.contains(id)) {
            return false;
        }
        locks.extend(product_ids.iter().copied());
        true
    }

    /// Release previously claimed row locks.
    pub fn unlock_rows(&self, product_ids: &[i64]) {
        let mut locks = self.row_locks.lock();
        for id in product_ids {
            locks.remove(id);
        }
    }

    // ========== Sequence Operations ==========

    /// Increment and return the global event sequence (within transaction)
    pub fn next_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Get current sequence (read-only)
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    // ========== Product Operations ==========

    /// Insert or replace a product row (own transaction, catalog seeding)
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let value = serde_json::to_vec(product)?;
            table.insert(product.id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Write a product row within a transaction (stock write-back)
    pub fn put_product_txn(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    /// Get a product by id
    pub fn get_product(&self, product_id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read a set of product rows. Missing ids are simply absent
    /// from the map; the caller decides whether that is an error.
    pub fn get_products(&self, product_ids: &[i64]) -> StorageResult<HashMap<i64, Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = HashMap::with_capacity(product_ids.len());
        for id in product_ids {
            if let Some(value) = table.get(*id)? {
                let product: Product = serde_json::from_slice(value.value())?;
                products.insert(*id, product);
            }
        }
        Ok(products)
    }

    // ========== Order Operations ==========

    /// Insert or replace an order row within a transaction
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by id (within a write transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of persisted orders
    pub fn order_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Order Item Operations ==========

    /// Bulk-write the line items of an order (once, at creation)
    pub fn put_order_items_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        items: &[OrderItem],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let value = serde_json::to_vec(items)?;
        table.insert(order_id, value.as_slice())?;
        Ok(())
    }

    /// Get the line items of an order
    pub fn get_order_items(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(vec![]),
        }
    }

    // ========== Status Ledger Operations ==========

    /// Append a status event (within transaction). Events are only
    /// ever inserted under a fresh (order_id, sequence) key, never
    /// overwritten.
    pub fn append_event_txn(
        &self,
        txn: &WriteTransaction,
        event: &StatusEvent,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STATUS_EVENTS_TABLE)?;
        let key = (event.order_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get the full status history of an order, oldest first
    pub fn get_status_history(&self, order_id: &str) -> StorageResult<Vec<StatusEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STATUS_EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: StatusEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Tracking Index ==========

    /// Check whether a tracking number is already taken (within transaction)
    pub fn tracking_exists_txn(
        &self,
        txn: &WriteTransaction,
        tracking_number: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(TRACKING_INDEX_TABLE)?;
        Ok(table.get(tracking_number)?.is_some())
    }

    /// Record a tracking number for an order (within transaction)
    pub fn index_tracking_txn(
        &self,
        txn: &WriteTransaction,
        tracking_number: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRACKING_INDEX_TABLE)?;
        table.insert(tracking_number, order_id)?;
        Ok(())
    }

    /// Find an order by its tracking number
    pub fn find_order_by_tracking(&self, tracking_number: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TRACKING_INDEX_TABLE)?;
        let Some(order_id) = index.get(tracking_number)? else {
            return Ok(None);
        };
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id.value())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Idempotency ==========

    /// Look up the order created by an earlier submission of this
    /// checkout id, if any
    pub fn find_processed_checkout(&self, checkout_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_CHECKOUTS_TABLE)?;
        Ok(table.get(checkout_id)?.map(|v| v.value().to_string()))
    }

    /// Same lookup, within a write transaction (double-check)
    pub fn find_processed_checkout_txn(
        &self,
        txn: &WriteTransaction,
        checkout_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PROCESSED_CHECKOUTS_TABLE)?;
        Ok(table.get(checkout_id)?.map(|v| v.value().to_string()))
    }

    /// Mark a checkout id as processed (within the creating transaction)
    pub fn mark_checkout_processed_txn(
        &self,
        txn: &WriteTransaction,
        checkout_id: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_CHECKOUTS_TABLE)?;
        table.insert(checkout_id, order_id)?;
        Ok(())
    }
}
