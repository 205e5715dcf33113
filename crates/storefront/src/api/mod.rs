//! Marketplace backend REST API.
//!
//! # Architecture
//!
//! - [`Backend`] is the seam between storefront logic and the network. The
//!   storefront only ever talks to `Arc<dyn Backend>`; tests substitute
//!   [`MockBackend`].
//! - [`ApiClient`] is the production implementation on top of `reqwest`.
//!   The backend is the source of truth - nothing is persisted locally; the
//!   only local state is the session cookie held by the HTTP client.
//! - Catalog reads (products, categories, stats) are cached in memory via
//!   `moka`. Cart, wishlist and order calls are never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! use farmgate_storefront::api::{ApiClient, Backend};
//!
//! let client = ApiClient::new(&config.api)?;
//! let cart = client.adjust_cart(&CartAdjustment {
//!     user_id: user.id.clone(),
//!     product_id: product.id.clone(),
//!     quantity: 3,
//! }).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;
use farmgate_core::{ProductId, UserId};
use mockall::automock;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {}{}", .status, format_message(.message.as_deref()))]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, if the backend sent one.
        message: Option<String>,
    },

    /// The response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built from the configured base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn format_message(message: Option<&str>) -> String {
    message.map(|m| format!(" - {m}")).unwrap_or_default()
}

impl ApiError {
    /// The backend-provided message, if any.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// HTTP status of the failure, if the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the request because the session is not authenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Operations the storefront needs from the marketplace backend.
///
/// Every mutation returns the authoritative server state so callers can
/// replace their snapshot wholesale.
#[automock]
#[async_trait]
pub trait Backend: Send + Sync {
    // Auth ------------------------------------------------------------------

    /// `GET /api/auth/profile` - the user behind the current session credential.
    async fn fetch_profile(&self) -> Result<User, ApiError>;

    /// `POST /api/auth/login`.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// `POST /api/auth/register`.
    async fn register(&self, data: &Registration) -> Result<User, ApiError>;

    /// `POST /api/auth/verify-otp`.
    async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), ApiError>;

    /// `POST /api/auth/logout`.
    async fn logout(&self) -> Result<(), ApiError>;

    /// `PUT /api/auth/profile`.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError>;

    // Catalog ---------------------------------------------------------------

    /// `GET /api/goods`.
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /api/categories`.
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `GET /api/goods/stats`.
    async fn product_stats(&self) -> Result<ProductStats, ApiError>;

    // Cart ------------------------------------------------------------------

    /// `GET /api/cart/{userId}`. A missing cart is returned as an empty one.
    async fn fetch_cart(&self, user: &UserId) -> Result<Cart, ApiError>;

    /// `POST /api/cart/add` with a signed quantity delta.
    async fn adjust_cart(&self, adjustment: &CartAdjustment) -> Result<Cart, ApiError>;

    /// `POST /api/cart/remove`.
    async fn remove_from_cart(&self, user: &UserId, product: &ProductId) -> Result<Cart, ApiError>;

    /// `DELETE /api/cart/clear/{userId}`.
    async fn clear_cart(&self, user: &UserId) -> Result<Cart, ApiError>;

    // Wishlist --------------------------------------------------------------

    /// `GET /api/wishlist/{userId}`. A missing wishlist is returned as an empty one.
    async fn fetch_wishlist(&self, user: &UserId) -> Result<Wishlist, ApiError>;

    /// `POST /api/wishlist/add`.
    async fn add_to_wishlist(&self, user: &UserId, product: &ProductId)
    -> Result<Wishlist, ApiError>;

    /// `POST /api/wishlist/remove`.
    async fn remove_from_wishlist(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<Wishlist, ApiError>;

    /// `DELETE /api/wishlist/clear/{userId}`.
    async fn clear_wishlist(&self, user: &UserId) -> Result<Wishlist, ApiError>;

    // Orders ----------------------------------------------------------------

    /// `POST /api/orders/place`.
    async fn place_order(&self, order: &PlaceOrderRequest) -> Result<Order, ApiError>;

    /// `GET /api/orders/user/{userId}`.
    async fn user_orders(&self, user: &UserId) -> Result<Vec<Order>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 400,
            message: Some("Not enough stock for Maize".to_string()),
        };
        assert_eq!(err.to_string(), "API error: 400 - Not enough stock for Maize");

        let err = ApiError::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "API error: 502");
    }

    #[test]
    fn test_backend_message_ignores_blank() {
        let err = ApiError::Api {
            status: 500,
            message: Some("  ".to_string()),
        };
        assert_eq!(err.backend_message(), None);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_unauthorized() {
        let err = ApiError::Api {
            status: 401,
            message: None,
        };
        assert!(err.is_unauthorized());
    }
}
