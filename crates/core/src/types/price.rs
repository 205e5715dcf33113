//! Price arithmetic and display using decimal math.
//!
//! Every place that shows a product price (catalog, cart, wishlist, order
//! history) goes through [`effective_price`] and [`format_amount`], so a bad
//! price from the backend renders as `0.00` everywhere instead of crashing
//! one view and not another.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Compute the effective unit price after a percentage discount.
///
/// `price` is clamped to be non-negative and `discount` to `[0, 100]`, so the
/// result never exceeds `price`. A zero discount returns `price` unchanged.
///
/// ```
/// use farmgate_core::effective_price;
/// use rust_decimal::Decimal;
///
/// let price = Decimal::new(1000, 2); // 10.00
/// assert_eq!(effective_price(price, Decimal::new(20, 0)), Decimal::new(800, 2));
/// assert_eq!(effective_price(price, Decimal::ZERO), price);
/// ```
#[must_use]
pub fn effective_price(price: Decimal, discount: Decimal) -> Decimal {
    let price = price.max(Decimal::ZERO);
    let discount = discount.clamp(Decimal::ZERO, HUNDRED);

    if discount.is_zero() {
        return price;
    }

    // Near `Decimal::MAX` the exact product overflows; scale down first.
    let reduction = price.checked_mul(discount).map_or_else(
        || (price / HUNDRED).saturating_mul(discount),
        |scaled| scaled / HUNDRED,
    );
    (price - reduction).max(Decimal::ZERO)
}

/// Format an amount with exactly two decimals, rounding half away from zero.
///
/// ```
/// use farmgate_core::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(Decimal::ZERO), "0.00");
/// assert_eq!(format_amount(Decimal::new(16, 0)), "16.00");
/// assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
/// ```
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Display form of a product price.
///
/// `original` is only present when a discount actually applies, so views
/// show a struck-through original price exactly when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTag {
    /// Price the customer pays per unit.
    pub effective: Decimal,
    /// Undiscounted price, when a discount applies.
    pub original: Option<Decimal>,
    /// Discount percentage as shown on the badge (clamped to `[0, 100]`).
    pub discount: Decimal,
}

impl PriceTag {
    /// Build a price tag from a base price and discount percentage.
    #[must_use]
    pub fn new(price: Decimal, discount: Decimal) -> Self {
        let discount = discount.clamp(Decimal::ZERO, HUNDRED);
        let effective = effective_price(price, discount);
        let original = (discount > Decimal::ZERO).then(|| price.max(Decimal::ZERO));

        Self {
            effective,
            original,
            discount,
        }
    }

    /// Whether a discount applies.
    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.original.is_some()
    }
}

/// ISO 4217 currency codes used by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Rwandan franc.
    #[default]
    RWF,
    USD,
}

impl CurrencyCode {
    /// Symbol prefix used in the storefront.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::RWF => "Frw",
            Self::USD => "$",
        }
    }

    /// Format an amount with this currency's symbol (e.g., `Frw16.00`).
    #[must_use]
    pub fn format(&self, amount: Decimal) -> String {
        format!("{}{}", self.symbol(), format_amount(amount))
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RWF" => Ok(Self::RWF),
            "USD" => Ok(Self::USD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_zero_discount_returns_price_exactly() {
        for price in ["0", "0.10", "10.00", "999.999", "1234567.89"] {
            assert_eq!(effective_price(d(price), Decimal::ZERO), d(price));
        }
    }

    #[test]
    fn test_effective_never_exceeds_price() {
        for price in ["0", "0.01", "10", "19.99", "250000"] {
            for discount in ["0", "0.5", "1", "20", "33.3", "99.99", "100"] {
                let effective = effective_price(d(price), d(discount));
                assert!(effective <= d(price), "{price} @ {discount}% -> {effective}");
                assert!(effective >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_full_discount_is_free() {
        assert_eq!(effective_price(d("42.00"), d("100")), Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(effective_price(d("-5"), d("10")), Decimal::ZERO);
        assert_eq!(effective_price(d("10"), d("-10")), d("10"));
        assert_eq!(effective_price(d("10"), d("150")), Decimal::ZERO);
    }

    #[test]
    fn test_huge_price_does_not_overflow() {
        let effective = effective_price(Decimal::MAX, d("50"));
        assert!(effective > Decimal::ZERO);
        assert!(effective < Decimal::MAX);
        assert!((effective - Decimal::MAX / d("2")).abs() <= Decimal::ONE);

        assert_eq!(effective_price(Decimal::MAX, d("100")), Decimal::ZERO);
        assert_eq!(effective_price(Decimal::MAX, Decimal::ZERO), Decimal::MAX);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(d("8")), "8.00");
        assert_eq!(format_amount(d("0.005")), "0.01");
        assert_eq!(format_amount(d("2.344")), "2.34");
        assert_eq!(format_amount(d("1000.5")), "1000.50");
    }

    #[test]
    fn test_price_tag_only_shows_original_when_discounted() {
        let plain = PriceTag::new(d("10"), Decimal::ZERO);
        assert_eq!(plain.effective, d("10"));
        assert!(plain.original.is_none());
        assert!(!plain.is_discounted());

        let discounted = PriceTag::new(d("10"), d("20"));
        assert_eq!(discounted.effective, d("8"));
        assert_eq!(discounted.original, Some(d("10")));
        assert!(discounted.is_discounted());
    }

    #[test]
    fn test_currency_format() {
        assert_eq!(CurrencyCode::RWF.format(d("16")), "Frw16.00");
        assert_eq!(CurrencyCode::USD.format(Decimal::ZERO), "$0.00");
        assert_eq!("rwf".parse::<CurrencyCode>(), Ok(CurrencyCode::RWF));
        assert!("xyz".parse::<CurrencyCode>().is_err());
    }
}
