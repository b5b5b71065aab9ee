use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product row as the checkout engine sees it.
///
/// `available` is derived state: it must always equal `stock > 0`.
/// Every stock mutation goes through [`Product::set_stock`], so the
/// flag is re-derived on each write and can never drift from the
/// quantity. Readers must still not trust an `available` value read
/// before lock acquisition; only a locked snapshot is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Live catalog price. Checkout honors cart-line snapshots, not
    /// this field.
    pub price: Decimal,
    pub stock: u32,
    pub available: bool,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
            available: stock > 0,
        }
    }

    /// Write a new stock level and re-derive `available`.
    pub fn set_stock(&mut self, stock: u32) {
        self.stock = stock;
        self.available = stock > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_follows_stock() {
        let mut product = Product::new(1, "Widget", Decimal::new(999, 2), 3);
        assert!(product.available);

        product.set_stock(0);
        assert!(!product.available);

        product.set_stock(7);
        assert!(product.available);
    }
}
