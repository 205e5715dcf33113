//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Transitions are driven exclusively by the backend:
/// `pending -> confirmed -> shipped -> delivered`, or `-> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    /// A status this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the backend will not move this order any further.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Payment method recorded on an order.
///
/// The storefront only places cash-on-delivery orders, but the backend may
/// report other methods for orders created elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Other(String),
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("COD") {
            Self::CashOnDelivery
        } else {
            Self::Other(value)
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => "COD".to_string(),
            PaymentMethod::Other(value) => value,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => f.write_str("Cash on Delivery"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_order_status_decoding() -> TestResult {
        let status: OrderStatus = serde_json::from_str("\"shipped\"")?;
        assert_eq!(status, OrderStatus::Shipped);

        let status: OrderStatus = serde_json::from_str("\"on_hold\"")?;
        assert_eq!(status, OrderStatus::Unknown);
        Ok(())
    }

    #[test]
    fn test_final_statuses() {
        assert!(OrderStatus::Delivered.is_final());
        assert!(OrderStatus::Cancelled.is_final());
        assert!(!OrderStatus::Pending.is_final());
        assert!(!OrderStatus::Shipped.is_final());
    }

    #[test]
    fn test_payment_method_round_trip() -> TestResult {
        let cod: PaymentMethod = serde_json::from_str("\"COD\"")?;
        assert_eq!(cod, PaymentMethod::CashOnDelivery);
        assert_eq!(serde_json::to_string(&cod)?, "\"COD\"");

        let card: PaymentMethod = serde_json::from_str("\"card\"")?;
        assert_eq!(card, PaymentMethod::Other("card".to_string()));
        assert_eq!(card.to_string(), "card");
        Ok(())
    }
}
