//! Cart snapshot with memoized totals.

use farmgate_core::ProductId;
use rust_decimal::Decimal;

use crate::api::Cart;

/// Aggregates derived from a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum of line quantities.
    pub item_count: i64,
    /// Sum of effective unit price times quantity.
    pub subtotal: Decimal,
    /// Number of distinct products.
    pub line_count: usize,
}

impl CartTotals {
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        cart.items.iter().fold(Self::default(), |totals, line| Self {
            item_count: totals.item_count.saturating_add(line.quantity),
            subtotal: totals.subtotal.saturating_add(line.line_total()),
            line_count: totals.line_count + 1,
        })
    }
}

/// The last-known-good cart; totals are computed once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    cart: Cart,
    totals: CartTotals,
}

impl CartSnapshot {
    #[must_use]
    pub fn new(cart: Cart) -> Self {
        let totals = CartTotals::of(&cart);
        Self { cart, totals }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn totals(&self) -> CartTotals {
        self.totals
    }

    #[must_use]
    pub const fn item_count(&self) -> i64 {
        self.totals.item_count
    }

    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.totals.subtotal
    }

    /// Quantity of a product in the cart (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, product: &ProductId) -> i64 {
        self.cart.line(product).map_or(0, |line| line.quantity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cart(items: serde_json::Value) -> Cart {
        serde_json::from_value::<Cart>(json!({"_id": "c1", "user": "u1", "items": items}))
            .unwrap()
            .normalized()
    }

    #[test]
    fn test_totals_with_discount() {
        let snapshot = CartSnapshot::new(cart(json!([
            {"product": {"_id": "p1", "price": 10, "discount": 20}, "quantity": 2},
            {"product": {"_id": "p2", "price": "2.50"}, "quantity": 3}
        ])));

        assert_eq!(snapshot.item_count(), 5);
        assert_eq!(snapshot.subtotal(), Decimal::new(2350, 2));
        assert_eq!(snapshot.totals().line_count, 2);
        assert_eq!(snapshot.quantity_of(&ProductId::new("p2")), 3);
        assert_eq!(snapshot.quantity_of(&ProductId::new("missing")), 0);
    }

    #[test]
    fn test_empty_cart_totals() {
        let snapshot = CartSnapshot::new(Cart::default());
        assert_eq!(snapshot.totals(), CartTotals::default());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let snapshot = CartSnapshot::new(cart(json!([
            {"product": {"_id": "p1", "price": "79228162514264337593543950335", "discount": 50}, "quantity": 2},
            {"product": {"_id": "p2", "price": "79228162514264337593543950335"}, "quantity": 1},
            {"product": {"_id": "p3", "price": 1}, "quantity": i64::MAX}
        ])));

        assert_eq!(snapshot.subtotal(), Decimal::MAX);
        assert_eq!(snapshot.item_count(), i64::MAX);
        assert_eq!(snapshot.totals().line_count, 3);
    }

    #[test]
    fn test_garbage_price_counts_as_zero() {
        let snapshot = CartSnapshot::new(cart(json!([
            {"product": {"_id": "p1", "price": "free"}, "quantity": 4}
        ])));
        assert_eq!(snapshot.item_count(), 4);
        assert_eq!(snapshot.subtotal(), Decimal::ZERO);
    }
}
