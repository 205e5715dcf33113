//! Lenient decoding for numeric fields in backend payloads.
//!
//! Product documents in the marketplace are created by sellers through an
//! admin tool that does not enforce types, so a price can arrive as a JSON
//! number, a numeric string, `null`, or be missing entirely. Every numeric
//! field is decoded through these helpers: anything that is not a usable
//! number becomes zero instead of failing the whole payload.
//!
//! Use with `#[serde(default, deserialize_with = "...")]`.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret an arbitrary JSON value as a decimal, falling back to zero.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => Decimal::ZERO,
    }
}

fn parse_decimal(s: &str) -> Decimal {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

/// Decode a decimal amount (price, discount, rating, total).
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value.
pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(Decimal::ZERO, decimal_from_value))
}

/// Decode a signed integer (cart quantities), truncating fractions.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value.
pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(decimal_from_value)
        .and_then(|d| d.trunc().to_i64())
        .unwrap_or(0))
}

/// Decode a non-negative count (stock, item counts). Negative values become zero.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value.
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = integer(deserializer)?;
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "super::decimal")]
        price: Decimal,
        #[serde(default, deserialize_with = "super::integer")]
        quantity: i64,
        #[serde(default, deserialize_with = "super::count")]
        stock: u32,
    }

    #[test]
    fn test_numbers_and_numeric_strings() -> TestResult {
        let sample: Sample =
            serde_json::from_str(r#"{"price": "12.50", "quantity": 3, "stock": "7"}"#)?;
        assert_eq!(sample.price, Decimal::new(1250, 2));
        assert_eq!(sample.quantity, 3);
        assert_eq!(sample.stock, 7);
        Ok(())
    }

    #[test]
    fn test_garbage_decodes_to_zero() -> TestResult {
        let sample: Sample =
            serde_json::from_str(r#"{"price": "abc", "quantity": null, "stock": {"a": 1}}"#)?;
        assert_eq!(sample.price, Decimal::ZERO);
        assert_eq!(sample.quantity, 0);
        assert_eq!(sample.stock, 0);
        Ok(())
    }

    #[test]
    fn test_missing_fields_decode_to_zero() -> TestResult {
        let sample: Sample = serde_json::from_str("{}")?;
        assert_eq!(sample.price, Decimal::ZERO);
        assert_eq!(sample.quantity, 0);
        assert_eq!(sample.stock, 0);
        Ok(())
    }

    #[test]
    fn test_negative_stock_clamps_but_quantity_keeps_sign() -> TestResult {
        let sample: Sample = serde_json::from_str(r#"{"quantity": -2, "stock": -5}"#)?;
        assert_eq!(sample.quantity, -2);
        assert_eq!(sample.stock, 0);
        Ok(())
    }

    #[test]
    fn test_float_quantity_truncates() -> TestResult {
        let sample: Sample = serde_json::from_str(r#"{"quantity": 2.9}"#)?;
        assert_eq!(sample.quantity, 2);
        Ok(())
    }
}
