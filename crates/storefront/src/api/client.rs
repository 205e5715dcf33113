//! HTTP implementation of [`Backend`].
//!
//! Uses `reqwest` 0.13 with a cookie store so the session cookie set by
//! `/api/auth/login` is sent on every later request. Catalog reads are
//! cached using `moka` (TTL from configuration, 5 minutes by default).

use std::sync::Arc;

use async_trait::async_trait;
use farmgate_core::{ProductId, UserId};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Cart, CartAdjustment, Category, Credentials, LoginResponse, Order, PlaceOrderRequest,
    Product, ProductStats, ProfileUpdate, Registration, User, Wishlist,
};
use super::{ApiError, Backend};
use crate::config::ApiConfig;

/// Longest slice of a response body that is written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
struct GoodsEnvelope {
    #[serde(default)]
    goods: Vec<Product>,
}

/// Register and profile updates answer with `{ user }`; older deployments
/// answer with the bare user document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: User },
    Bare(User),
}

impl UserPayload {
    fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace backend.
///
/// Cheap to clone; clones share the HTTP connection pool, cookie jar and
/// catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                cache,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        let mut request = self.inner.client.request(method, url);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }
        Ok(request)
    }

    /// Send a request and return the raw response body.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed.message.or(parsed.error);

            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %truncate(&body),
                    "Backend returned server error"
                );
            } else {
                debug!(status = %status, message = ?message, "Backend rejected request");
            }

            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(body),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn cart_payload(&self, user: &UserId, request: RequestBuilder) -> Result<Cart, ApiError> {
        let cart: Option<Cart> = self.send(request).await?;
        Ok(cart.map_or_else(|| Cart::empty_for(user), Cart::normalized))
    }

    async fn wishlist_payload(
        &self,
        user: &UserId,
        request: RequestBuilder,
    ) -> Result<Wishlist, ApiError> {
        let wishlist: Option<Wishlist> = self.send(request).await?;
        Ok(wishlist.map_or_else(|| Wishlist::empty_for(user), Wishlist::normalized))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

fn user_path(prefix: &str, user: &UserId) -> String {
    format!("{prefix}/{}", urlencoding::encode(user.as_str()))
}

#[async_trait]
impl Backend for ApiClient {
    // =========================================================================
    // Auth
    // =========================================================================

    #[instrument(skip(self))]
    async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.send(self.request(Method::GET, "api/auth/profile")?).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.send(self.request(Method::POST, "api/auth/login")?.json(credentials))
            .await
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    async fn register(&self, data: &Registration) -> Result<User, ApiError> {
        let payload: UserPayload = self
            .send(self.request(Method::POST, "api/auth/register")?.json(data))
            .await?;
        Ok(payload.into_user())
    }

    #[instrument(skip(self, otp))]
    async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email, "otp": otp });
        self.send_unit(self.request(Method::POST, "api/auth/verify-otp")?.json(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::POST, "api/auth/logout")?)
            .await
    }

    #[instrument(skip(self, update))]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let payload: UserPayload = self
            .send(self.request(Method::PUT, "api/auth/profile")?.json(update))
            .await?;
        Ok(payload.into_user())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let envelope: Option<GoodsEnvelope> =
            self.send(self.request(Method::GET, "api/goods")?).await?;
        let products = envelope.map(|e| e.goods).unwrap_or_default();

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Option<Vec<Category>> =
            self.send(self.request(Method::GET, "api/categories")?).await?;
        let categories = categories.unwrap_or_default();

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn product_stats(&self) -> Result<ProductStats, ApiError> {
        if let Some(CacheValue::Stats(stats)) = self.inner.cache.get(&CacheKey::Stats).await {
            debug!("Cache hit for product stats");
            return Ok(*stats);
        }

        let stats: Option<ProductStats> = self
            .send(self.request(Method::GET, "api/goods/stats")?)
            .await?;
        let stats = stats.unwrap_or_default();

        self.inner
            .cache
            .insert(CacheKey::Stats, CacheValue::Stats(Box::new(stats.clone())))
            .await;

        Ok(stats)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_cart(&self, user: &UserId) -> Result<Cart, ApiError> {
        let request = self.request(Method::GET, &user_path("api/cart", user))?;
        self.cart_payload(user, request).await
    }

    #[instrument(
        skip(self, adjustment),
        fields(user = %adjustment.user_id, product = %adjustment.product_id, delta = adjustment.quantity)
    )]
    async fn adjust_cart(&self, adjustment: &CartAdjustment) -> Result<Cart, ApiError> {
        let request = self.request(Method::POST, "api/cart/add")?.json(adjustment);
        self.cart_payload(&adjustment.user_id, request).await
    }

    #[instrument(skip(self), fields(user = %user, product = %product))]
    async fn remove_from_cart(&self, user: &UserId, product: &ProductId) -> Result<Cart, ApiError> {
        let body = json!({ "userId": user, "productId": product });
        let request = self.request(Method::POST, "api/cart/remove")?.json(&body);
        self.cart_payload(user, request).await
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn clear_cart(&self, user: &UserId) -> Result<Cart, ApiError> {
        let request = self.request(Method::DELETE, &user_path("api/cart/clear", user))?;
        self.cart_payload(user, request).await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_wishlist(&self, user: &UserId) -> Result<Wishlist, ApiError> {
        let request = self.request(Method::GET, &user_path("api/wishlist", user))?;
        self.wishlist_payload(user, request).await
    }

    #[instrument(skip(self), fields(user = %user, product = %product))]
    async fn add_to_wishlist(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<Wishlist, ApiError> {
        let body = json!({ "userId": user, "productId": product });
        let request = self.request(Method::POST, "api/wishlist/add")?.json(&body);
        self.wishlist_payload(user, request).await
    }

    #[instrument(skip(self), fields(user = %user, product = %product))]
    async fn remove_from_wishlist(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<Wishlist, ApiError> {
        let body = json!({ "userId": user, "productId": product });
        let request = self.request(Method::POST, "api/wishlist/remove")?.json(&body);
        self.wishlist_payload(user, request).await
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn clear_wishlist(&self, user: &UserId) -> Result<Wishlist, ApiError> {
        let request = self.request(Method::DELETE, &user_path("api/wishlist/clear", user))?;
        self.wishlist_payload(user, request).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    #[instrument(skip(self, order), fields(user = %order.user_id, lines = order.items.len()))]
    async fn place_order(&self, order: &PlaceOrderRequest) -> Result<Order, ApiError> {
        let placed: Order = self
            .send(self.request(Method::POST, "api/orders/place")?.json(order))
            .await?;

        // Stock levels changed.
        self.inner.cache.invalidate(&CacheKey::Products).await;
        self.inner.cache.invalidate(&CacheKey::Stats).await;

        Ok(placed)
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn user_orders(&self, user: &UserId) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> = self
            .send(self.request(Method::GET, &user_path("api/orders/user", user))?)
            .await?;
        Ok(orders.unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_request_urls_keep_base_path() {
        let client = client("https://market.example.rw/v1");
        let request = client
            .request(Method::GET, &user_path("api/cart", &UserId::new("u 1")))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://market.example.rw/v1/api/cart/u%201"
        );
    }

    #[test]
    fn test_bearer_token_attached() {
        let mut config = ApiConfig::new("http://localhost:5000").unwrap();
        config.token = Some(SecretString::from("tok_123"));
        let client = ApiClient::new(&config).unwrap();

        let request = client
            .request(Method::GET, "api/auth/profile")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok_123"
        );
    }

    #[test]
    fn test_user_payload_shapes() {
        let wrapped: UserPayload =
            serde_json::from_str(r#"{"user": {"_id": "u1", "userName": "Aline"}}"#).unwrap();
        assert_eq!(wrapped.into_user().id.as_str(), "u1");

        let bare: UserPayload = serde_json::from_str(r#"{"_id": "u2"}"#).unwrap();
        assert_eq!(bare.into_user().id.as_str(), "u2");
    }

    #[test]
    fn test_error_body_fields() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Unauthorized"}"#).unwrap();
        assert_eq!(body.message.or(body.error).as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_debug_hides_token() {
        let mut config = ApiConfig::new("http://localhost:5000").unwrap();
        config.token = Some(SecretString::from("tok_hidden"));
        let client = ApiClient::new(&config).unwrap();
        assert!(!format!("{client:?}").contains("tok_hidden"));
    }
}
