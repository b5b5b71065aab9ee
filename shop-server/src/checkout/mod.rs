//! Checkout engine - cart to durable order
//!
//! One successful call turns a reviewed cart into a committed order:
//! validation, row locking, availability checks, pricing, order plus
//! items plus stock decrements plus the first ledger entries, all in
//! a single write transaction. Any failure before commit rolls back
//! completely; the order-placed notification goes out only after.
//!
//! `checkout_id` makes the call idempotent. The id is checked before
//! taking locks and again inside the write transaction, and it is
//! marked processed by the same commit that creates the order, so a
//! retried submission can only ever observe "not processed yet" or
//! "processed, here is the order", never create a second one.

mod error;

pub use error::{EngineError, EngineResult};

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{info, warn};

use shared::order::{
    CheckoutRequest, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
};
use shared::util::now_millis;

use crate::inventory::{InventoryLockManager, RetryPolicy};
use crate::ledger::append_status_txn;
use crate::notify::{NotificationEvent, NotificationPort};
use crate::pricing::{compute_totals, delivery_offset_days};
use crate::storage::StoreStorage;

const TRACKING_NUMBER_LEN: usize = 10;
const LOW_STOCK_THRESHOLD: u32 = 5;

/// Turns checkout requests into committed orders.
pub struct CheckoutEngine {
    storage: StoreStorage,
    locks: InventoryLockManager,
    notifier: Arc<dyn NotificationPort>,
}

impl CheckoutEngine {
    pub fn new(
        storage: StoreStorage,
        policy: RetryPolicy,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        let locks = InventoryLockManager::new(storage.clone(), policy);
        Self {
            storage,
            locks,
            notifier,
        }
    }

    /// Process one checkout request.
    ///
    /// Returns the committed order, or the already-committed order if
    /// this `checkout_id` was processed before.
    pub async fn checkout(&self, request: &CheckoutRequest) -> EngineResult<Order> {
        validate_request(request)?;

        if request.cart.version() != request.cart_version {
            return Err(EngineError::CartChanged);
        }

        // Idempotency pre-check before any locking
        if let Some(order_id) = self.storage.find_processed_checkout(&request.checkout_id)? {
            info!(
                checkout_id = %request.checkout_id,
                order_id = %order_id,
                "Duplicate checkout, returning existing order"
            );
            return self
                .storage
                .get_order(&order_id)?
                .ok_or(EngineError::OrderNotFound(order_id));
        }

        let product_ids: Vec<i64> = request.cart.lines().iter().map(|l| l.product_id).collect();
        let guard = self.locks.lock_products(&product_ids).await?;

        let txn = self.storage.begin_write()?;

        // Double-check under the write transaction: a racing retry of
        // the same id may have committed while we waited for locks
        if let Some(order_id) = self
            .storage
            .find_processed_checkout_txn(&txn, &request.checkout_id)?
        {
            drop(txn);
            return self
                .storage
                .get_order(&order_id)?
                .ok_or(EngineError::OrderNotFound(order_id));
        }

        // Availability against the locked snapshots; all problems are
        // collected so the customer can fix the cart in one pass
        let mut problems = Vec::new();
        for line in request.cart.lines() {
            let product = match guard.product(line.product_id) {
                Some(p) => p,
                None => {
                    problems.push(format!("{} is no longer available", line.product_name));
                    continue;
                }
            };
            if !product.available {
                problems.push(format!(
                    "{} is no longer available for purchase",
                    product.name
                ));
            } else if product.stock < line.quantity {
                problems.push(format!(
                    "{} has insufficient stock (requested: {}, available: {})",
                    product.name, line.quantity, product.stock
                ));
            }
        }
        if !problems.is_empty() {
            drop(txn);
            return Err(EngineError::ProductUnavailable(problems));
        }

        let totals = compute_totals(request.cart.lines(), request.shipping_method);
        let tracking_number = self.generate_tracking_number(&txn)?;
        let estimated_delivery = Utc::now().date_naive()
            + Duration::days(delivery_offset_days(request.shipping_method));

        let mut order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id,
            contact: request.contact.clone(),
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping_cost,
            tax: totals.tax,
            total_amount: totals.total,
            shipping_method: request.shipping_method,
            payment_method: request.payment_method,
            tracking_number,
            estimated_delivery,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now_millis(),
            payment_date: None,
            shipped_date: None,
            delivered_date: None,
        };

        self.storage.put_order_txn(&txn, &order)?;
        self.storage
            .index_tracking_txn(&txn, &order.tracking_number, &order.id)?;

        let items: Vec<OrderItem> = request
            .cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                order_id: order.id.clone(),
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();
        self.storage.put_order_items_txn(&txn, &order.id, &items)?;

        // Stock write-back. Duplicate cart lines were rejected up
        // front, so each locked row is decremented exactly once.
        for line in request.cart.lines() {
            // Availability check above guarantees presence and stock
            let Some(product) = guard.product(line.product_id) else {
                drop(txn);
                return Err(EngineError::ProductUnavailable(vec![format!(
                    "{} is no longer available",
                    line.product_name
                )]));
            };
            let mut updated = product.clone();
            updated.set_stock(product.stock - line.quantity);
            self.storage.put_product_txn(&txn, &updated)?;

            if updated.stock <= LOW_STOCK_THRESHOLD {
                warn!(
                    product_id = updated.id,
                    product_name = %updated.name,
                    stock = updated.stock,
                    "Low stock after checkout"
                );
            }
        }

        append_status_txn(
            &self.storage,
            &txn,
            &mut order,
            OrderStatus::Pending,
            "Order placed successfully",
            request.user_id.to_string(),
        )?;

        // Payment settlement. Cash on delivery stays unpaid but the
        // order is confirmed; every other method settles immediately.
        if request.payment_method == PaymentMethod::CashOnDelivery {
            append_status_txn(
                &self.storage,
                &txn,
                &mut order,
                OrderStatus::Confirmed,
                "Order confirmed - Cash on Delivery",
                "system",
            )?;
        } else {
            order.payment_status = PaymentStatus::Completed;
            order.payment_date = Some(now_millis());
            append_status_txn(
                &self.storage,
                &txn,
                &mut order,
                OrderStatus::Processing,
                "Payment processed successfully",
                "system",
            )?;
        }

        self.storage
            .mark_checkout_processed_txn(&txn, &request.checkout_id, &order.id)?;

        txn.commit().map_err(crate::storage::StorageError::from)?;
        drop(guard);

        info!(
            order_id = %order.id,
            tracking_number = %order.tracking_number,
            user_id = request.user_id,
            total = %order.total_amount,
            status = %order.status,
            "Order created"
        );

        if let Err(e) = self
            .notifier
            .notify(NotificationEvent::OrderPlaced {
                order: order.clone(),
            })
            .await
        {
            warn!(
                order_id = %order.id,
                error = %e,
                "Order notification failed, confirmation may be delayed"
            );
        }

        Ok(order)
    }

    /// Generate a tracking number that is unique within the creating
    /// transaction: 10 uppercase alphanumeric characters, regenerated
    /// on the (rare) collision with an existing order.
    fn generate_tracking_number(
        &self,
        txn: &redb::WriteTransaction,
    ) -> EngineResult<String> {
        loop {
            let candidate = random_tracking_candidate();
            if !self.storage.tracking_exists_txn(txn, &candidate)? {
                return Ok(candidate);
            }
        }
    }
}

fn random_tracking_candidate() -> String {
    let mut rng = rand::thread_rng();
    (0..TRACKING_NUMBER_LEN)
        .map(|_| (rng.sample(rand::distributions::Alphanumeric) as char).to_ascii_uppercase())
        .collect()
}

fn validate_request(request: &CheckoutRequest) -> EngineResult<()> {
    if request.cart.is_empty() {
        return Err(EngineError::InvalidCart("Your cart is empty".to_string()));
    }
    // Carts arrive over the wire, so merging per product cannot be
    // assumed. A duplicate line would make the stock write-back lose
    // one of the two decrements.
    let mut seen = std::collections::HashSet::new();
    for line in request.cart.lines() {
        if !seen.insert(line.product_id) {
            return Err(EngineError::InvalidCart(format!(
                "Duplicate cart line for {}",
                line.product_name
            )));
        }
        if line.quantity == 0 {
            return Err(EngineError::InvalidCart(format!(
                "Invalid quantity for {}",
                line.product_name
            )));
        }
        if line.unit_price <= Decimal::ZERO {
            return Err(EngineError::InvalidCart(format!(
                "Invalid price for {}",
                line.product_name
            )));
        }
    }

    let contact = &request.contact;
    let address_fields = [
        &contact.address,
        &contact.city,
        &contact.state,
        &contact.zip_code,
    ];
    if address_fields.iter().any(|f| f.trim().is_empty()) {
        return Err(EngineError::InvalidCart(
            "Shipping address is incomplete".to_string(),
        ));
    }
    let digits = contact.phone.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return Err(EngineError::InvalidCart(
            "Phone number must be at least 10 digits".to_string(),
        ));
    }

    Ok(())
}
