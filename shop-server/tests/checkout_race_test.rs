//! Concurrency tests for the checkout engine against an on-disk store

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use shared::cart::{Cart, CartLine};
use shared::models::Product;
use shared::order::{CheckoutRequest, ContactInfo, PaymentMethod, ShippingMethod};
use shop_server::{CheckoutEngine, EngineError, LoggingNotifier, RetryPolicy, StoreStorage};

fn contact() -> ContactInfo {
    ContactInfo {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@example.com".to_string(),
        phone: "5550001111".to_string(),
        address: "1 Harbor Way".to_string(),
        city: "Arlington".to_string(),
        state: "VA".to_string(),
        zip_code: "22201".to_string(),
        order_notes: String::new(),
    }
}

fn single_line_cart(product_id: i64, quantity: u32) -> Cart {
    let mut cart = Cart::new();
    cart.add(CartLine {
        product_id,
        product_name: format!("product{product_id}"),
        unit_price: Decimal::new(1999, 2),
        quantity,
    });
    cart
}

fn patient_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 50,
        retry_delay: Duration::from_millis(10),
    }
}

fn engine_with_stock(dir: &tempfile::TempDir, stock: u32) -> (Arc<CheckoutEngine>, StoreStorage) {
    let storage = StoreStorage::open(dir.path().join("shop.redb")).unwrap();
    storage
        .upsert_product(&Product::new(1, "product1", Decimal::new(1999, 2), stock))
        .unwrap();
    let engine = Arc::new(CheckoutEngine::new(
        storage.clone(),
        patient_policy(),
        Arc::new(LoggingNotifier),
    ));
    (engine, storage)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, storage) = engine_with_stock(&dir, 5);

    let mut handles = Vec::new();
    for user_id in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let request = CheckoutRequest::new(
                user_id,
                single_line_cart(1, 1),
                ShippingMethod::Standard,
                PaymentMethod::CreditCard,
                contact(),
            );
            engine.checkout(&request).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::ProductUnavailable(_)) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(storage.order_count().unwrap(), 5);
    let product = storage.get_product(1).unwrap().unwrap();
    assert_eq!(product.stock, 0);
    assert!(!product.available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_sold_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, storage) = engine_with_stock(&dir, 1);

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let request = CheckoutRequest::new(
                1,
                single_line_cart(1, 1),
                ShippingMethod::Express,
                PaymentMethod::CashOnDelivery,
                contact(),
            );
            engine.checkout(&request).await
        })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let request = CheckoutRequest::new(
                2,
                single_line_cart(1, 1),
                ShippingMethod::Express,
                PaymentMethod::CashOnDelivery,
                contact(),
            );
            engine.checkout(&request).await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(winners, 1);
    assert_eq!(storage.order_count().unwrap(), 1);
    assert_eq!(storage.get_product(1).unwrap().unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_identical_checkout_ids_create_one_order() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, storage) = engine_with_stock(&dir, 10);

    let request = CheckoutRequest::new(
        7,
        single_line_cart(1, 2),
        ShippingMethod::Standard,
        PaymentMethod::CreditCard,
        contact(),
    );

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move { engine.checkout(&request).await }));
    }

    let mut order_ids = Vec::new();
    for handle in handles {
        order_ids.push(handle.await.unwrap().unwrap().id);
    }

    order_ids.dedup();
    assert_eq!(order_ids.len(), 1);
    assert_eq!(storage.order_count().unwrap(), 1);
    // The shared checkout id decremented stock exactly once
    assert_eq!(storage.get_product(1).unwrap().unwrap().stock, 8);
}
