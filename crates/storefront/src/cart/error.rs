//! User-facing cart and order errors.

use farmgate_core::ProductId;
use thiserror::Error;

use crate::api::ApiError;

/// Message shown when the backend rejects an order as invalid.
pub const VALIDATION_MESSAGE: &str =
    "Order validation failed. Please try again or contact support.";

const STOCK_PHRASES: [&str; 2] = ["not enough stock", "insufficient stock"];

/// Errors surfaced by cart mutations and order placement.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum CartError {
    /// Network or server failure; the message comes from the backend when it sent one.
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: ApiError,
    },

    /// The backend does not have enough stock for the requested quantity.
    #[error("{message}")]
    InsufficientStock {
        message: String,
        #[source]
        source: ApiError,
    },

    /// The backend rejected an order as invalid.
    #[error("Order validation failed. Please try again or contact support.")]
    Validation(#[source] ApiError),

    /// The fresh cart had no lines at order time.
    #[error("Your cart is empty")]
    EmptyCart,

    /// Another intent for the same product is in flight.
    #[error("Cart update already in progress for product {0}")]
    Busy(ProductId),

    /// An order is already being placed for this session.
    #[error("An order is already being placed")]
    OrderInProgress,
}

impl CartError {
    /// Classify a backend failure, using `fallback` when the backend sent no message.
    #[must_use]
    pub fn classify(source: ApiError, fallback: &str) -> Self {
        let message = source.backend_message().map(str::to_owned);
        let lowered = message.as_deref().map(str::to_lowercase).unwrap_or_default();

        if STOCK_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
            return Self::InsufficientStock {
                message: message.unwrap_or_else(|| fallback.to_string()),
                source,
            };
        }

        if source.status() == Some(400) && lowered.contains("validation failed") {
            return Self::Validation(source);
        }

        Self::Backend {
            message: message.unwrap_or_else(|| fallback.to_string()),
            source,
        }
    }

    /// Whether the snapshot should be refreshed after this error.
    #[must_use]
    pub const fn requires_refresh(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }

    /// Whether the error came from the backend rather than a local check.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. } | Self::InsufficientStock { .. } | Self::Validation(_)
        )
    }
}
