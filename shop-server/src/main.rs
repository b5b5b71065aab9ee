use std::sync::Arc;

use rust_decimal::Decimal;

use shared::cart::{Cart, CartLine};
use shared::models::Product;
use shared::order::{
    CheckoutRequest, ContactInfo, OrderStatus, PaymentMethod, ShippingMethod,
};
use shop_server::common::logger::init_logger_with_file;
use shop_server::config::Config;
use shop_server::{CheckoutEngine, LoggingNotifier, StatusLedger, StoreStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    let log_dir = config.log_dir().to_string_lossy().into_owned();
    let json_logs = config.log_json || config.is_production();
    init_logger_with_file(&config.log_level, json_logs, Some(&log_dir))?;

    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Shop server starting"
    );

    let storage = StoreStorage::open(config.database_path())?;
    seed_catalog(&storage)?;

    let notifier = Arc::new(LoggingNotifier);
    let engine = CheckoutEngine::new(storage.clone(), config.retry_policy(), notifier.clone());
    let ledger = StatusLedger::new(storage, notifier);

    run_demo_flow(&engine, &ledger).await?;
    Ok(())
}

/// Seed a small catalog on first start so the demo flow has stock to
/// sell.
fn seed_catalog(storage: &StoreStorage) -> anyhow::Result<()> {
    if storage.get_product(1)?.is_some() {
        return Ok(());
    }
    for product in [
        Product::new(1, "Mechanical Keyboard", Decimal::new(9999, 2), 25),
        Product::new(2, "USB-C Dock", Decimal::new(4950, 2), 40),
        Product::new(3, "Desk Mat", Decimal::new(1500, 2), 100),
    ] {
        storage.upsert_product(&product)?;
    }
    tracing::info!("Catalog seeded");
    Ok(())
}

/// Walk one order through its whole life: checkout, fulfillment
/// transitions, then the customer tracking view.
async fn run_demo_flow(engine: &CheckoutEngine, ledger: &StatusLedger) -> anyhow::Result<()> {
    let mut cart = Cart::new();
    cart.add(CartLine {
        product_id: 1,
        product_name: "Mechanical Keyboard".to_string(),
        unit_price: Decimal::new(9999, 2),
        quantity: 1,
    });
    cart.add(CartLine {
        product_id: 3,
        product_name: "Desk Mat".to_string(),
        unit_price: Decimal::new(1500, 2),
        quantity: 2,
    });

    let contact = ContactInfo {
        first_name: "Sample".to_string(),
        last_name: "Customer".to_string(),
        email: "customer@example.com".to_string(),
        phone: "5550123456".to_string(),
        address: "42 Demo Street".to_string(),
        city: "Springfield".to_string(),
        state: "OR".to_string(),
        zip_code: "97477".to_string(),
        order_notes: String::new(),
    };

    let request = CheckoutRequest::new(
        1,
        cart,
        ShippingMethod::Standard,
        PaymentMethod::CreditCard,
        contact,
    );
    let order = engine.checkout(&request).await?;

    for (status, note) in [
        (OrderStatus::Shipped, "Order shipped"),
        (OrderStatus::OutForDelivery, "Out for delivery"),
        (OrderStatus::Delivered, "Delivered to front door"),
    ] {
        ledger.append_status_event(&order.id, status, note, "system").await?;
    }

    let tracking = ledger.track_order(&order.tracking_number)?;
    println!("{}", serde_json::to_string_pretty(&tracking)?);
    Ok(())
}
