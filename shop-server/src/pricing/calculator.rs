//! Order totals calculator
//!
//! All arithmetic is fixed-point `Decimal`; tax is rounded half-up
//! to cents on the decimal representation, never through binary
//! floats, so identical carts always produce identical totals.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::cart::CartLine;
use shared::order::ShippingMethod;

/// Result of a totals calculation.
///
/// Invariant: `total == subtotal + shipping_cost + tax` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Flat tax rate applied to goods plus shipping (10%).
fn tax_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Flat shipping rate table.
pub fn shipping_cost(method: ShippingMethod) -> Decimal {
    match method {
        ShippingMethod::Standard => Decimal::new(500, 2),
        ShippingMethod::Express => Decimal::new(1500, 2),
        ShippingMethod::Pickup => Decimal::ZERO,
    }
}

/// Estimated-delivery offset from the checkout date, in days.
pub fn delivery_offset_days(method: ShippingMethod) -> i64 {
    match method {
        ShippingMethod::Express => 3,
        ShippingMethod::Standard => 7,
        ShippingMethod::Pickup => 1,
    }
}

/// Compute order totals from cart-line price snapshots.
///
/// `tax = round2((subtotal + shipping) * 0.10)` with half-up
/// rounding; the grand total is the exact sum of the three parts, so
/// the money invariant holds to the cent for every method/cart
/// combination.
pub fn compute_totals(lines: &[CartLine], method: ShippingMethod) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
    let shipping = shipping_cost(method);
    let tax = ((subtotal + shipping) * tax_rate())
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    OrderTotals {
        subtotal,
        shipping_cost: shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: 1,
            product_name: "productA".to_string(),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_standard_shipping_scenario() {
        // 2 x 99.99, standard: tax is round-half-up of 20.498
        let totals = compute_totals(&[line(9999, 2)], ShippingMethod::Standard);

        assert_eq!(totals.subtotal, dec(19998));
        assert_eq!(totals.shipping_cost, dec(500));
        assert_eq!(totals.tax, dec(2050));
        assert_eq!(totals.total, dec(22548));
    }

    #[test]
    fn test_express_shipping_scenario() {
        // 2 x 99.99, express: 10% of 214.98
        let totals = compute_totals(&[line(9999, 2)], ShippingMethod::Express);

        assert_eq!(totals.subtotal, dec(19998));
        assert_eq!(totals.shipping_cost, dec(1500));
        assert_eq!(totals.tax, dec(2150));
        assert_eq!(totals.total, dec(23648));
    }

    #[test]
    fn test_pickup_is_free_shipping() {
        let totals = compute_totals(&[line(10000, 1)], ShippingMethod::Pickup);

        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert_eq!(totals.tax, dec(1000));
        assert_eq!(totals.total, dec(11000));
    }

    #[test]
    fn test_tax_rounds_half_up_not_bankers() {
        // (0.25 + 0) * 0.10 = 0.025 -> half-up gives 0.03, banker's
        // rounding would give 0.02
        let totals = compute_totals(&[line(25, 1)], ShippingMethod::Pickup);
        assert_eq!(totals.tax, dec(3));
    }

    #[test]
    fn test_money_invariant_across_methods() {
        let lines = vec![line(9999, 2), line(1337, 3), line(49, 7)];
        for method in [
            ShippingMethod::Standard,
            ShippingMethod::Express,
            ShippingMethod::Pickup,
        ] {
            let t = compute_totals(&lines, method);
            assert_eq!(t.total, t.subtotal + t.shipping_cost + t.tax);
            assert_eq!(t.tax, t.tax.round_dp(2));
        }
    }

    #[test]
    fn test_empty_lines_totals_to_shipping_plus_tax() {
        let totals = compute_totals(&[], ShippingMethod::Standard);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, dec(550));
    }

    #[test]
    fn test_delivery_offsets() {
        assert_eq!(delivery_offset_days(ShippingMethod::Express), 3);
        assert_eq!(delivery_offset_days(ShippingMethod::Standard), 7);
        assert_eq!(delivery_offset_days(ShippingMethod::Pickup), 1);
    }
}
