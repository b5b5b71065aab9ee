//! Session cart - ephemeral lines with price snapshots
//!
//! The cart is owned by a single session and never persisted past
//! checkout, so it needs no locking. The `version` token exists to
//! detect the same user editing the cart from another tab between
//! reviewing an order and submitting it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product/quantity/price-snapshot entry in a session's pending
/// purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product_id: i64,
    /// Name snapshot, used in availability messages.
    pub product_name: String,
    /// Unit price frozen when the line was added. Checkout honors
    /// this snapshot for the lifetime of the cart, not the live
    /// catalog price.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Per-session shopping cart.
///
/// Lines are keyed by product: adding the same product again merges
/// quantities, so a cart never holds two lines for one product id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    version: u64,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line, merging quantity into an existing line for the
    /// same product. The first line's price snapshot wins.
    pub fn add(&mut self, line: CartLine) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => self.lines.push(line),
        }
        self.version += 1;
    }

    pub fn remove(&mut self, product_id: i64) {
        self.lines.retain(|l| l.product_id != product_id);
        self.version += 1;
    }

    /// Stable iteration order: insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.version += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Version token compared at checkout to catch concurrent edits.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id,
            product_name: format!("product-{product_id}"),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(line(1, 999, 2));
        cart.add(line(1, 999, 1));
        cart.add(line(2, 500, 1));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_total_price() {
        let mut cart = Cart::new();
        cart.add(line(1, 9999, 2)); // 199.98
        cart.add(line(2, 550, 1)); // 5.50

        assert_eq!(cart.total_price(), Decimal::new(20548, 2));
    }

    #[test]
    fn test_every_mutation_bumps_version() {
        let mut cart = Cart::new();
        assert_eq!(cart.version(), 0);

        cart.add(line(1, 100, 1));
        assert_eq!(cart.version(), 1);

        cart.remove(1);
        assert_eq!(cart.version(), 2);

        cart.clear();
        assert_eq!(cart.version(), 3);
    }
}
