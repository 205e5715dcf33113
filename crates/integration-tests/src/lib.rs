//! Scenario tests for the Farmgate storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Scenario tests against a mocked backend
//! cargo test -p farmgate-integration-tests
//!
//! # Live backend tests
//! FARMGATE_API_URL=http://localhost:5000 cargo test -p farmgate-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_reconciliation` - Snapshot, totals, and failure handling
//! - `order_placement` - Checkout request construction and cart clearing
//! - `same_key_policy` - Overlapping edits on one product
//! - `live_backend` - HTTP client against a running backend (ignored by default)
//!
//! Fixtures below panic on malformed JSON; they only ever see literals.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use farmgate_core::UserId;
use farmgate_storefront::api::{ApiError, Cart, MockBackend, Product, User, Wishlist};
use farmgate_storefront::cart::SameKeyPolicy;
use farmgate_storefront::config::{ApiConfig, StorefrontConfig};
use farmgate_storefront::notify::Notifier;
use farmgate_storefront::session::SessionContext;
use serde_json::{Value, json};

/// The shopper every scenario logs in as.
pub const USER: &str = "u-aline";

#[must_use]
pub fn user_id() -> UserId {
    UserId::new(USER)
}

#[must_use]
pub fn user() -> User {
    serde_json::from_value(json!({
        "_id": USER,
        "userName": "Aline Uwase",
        "email": "aline@farm.rw",
        "address": {"district": "Gasabo", "sector": "Remera"}
    }))
    .unwrap()
}

/// A backend error response.
#[must_use]
pub fn api_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Api {
        status,
        message: message.map(str::to_owned),
    }
}

/// A product sold by a fully-described seller.
#[must_use]
pub fn product(id: &str, price: &str, discount: &str) -> Product {
    product_with_owner(
        id,
        price,
        discount,
        json!({
            "userId": {"_id": "seller-jean"},
            "userName": "Jean Bosco",
            "email": "jean@farm.rw",
            "phone": "0788123456"
        }),
    )
}

/// A product with an arbitrary owner payload.
#[must_use]
pub fn product_with_owner(id: &str, price: &str, discount: &str, owner: Value) -> Product {
    serde_json::from_value(json!({
        "_id": id,
        "name": format!("Produce {id}"),
        "category": "Vegetables",
        "price": price,
        "discount": discount,
        "unit": "kg",
        "stock": 50,
        "user": owner
    }))
    .unwrap()
}

/// A cart for [`USER`] holding `(product, quantity)` lines.
#[must_use]
pub fn cart(lines: &[(Product, i64)]) -> Cart {
    let items: Vec<Value> = lines
        .iter()
        .map(|(product, quantity)| json!({"product": product, "quantity": quantity}))
        .collect();

    serde_json::from_value::<Cart>(json!({"_id": "cart-1", "user": USER, "items": items}))
        .unwrap()
        .normalized()
}

/// Let the session-start reads return an empty wishlist.
pub fn expect_empty_wishlist(mock: &mut MockBackend) {
    mock.expect_fetch_wishlist()
        .returning(|user| Ok(Wishlist::empty_for(user)));
}

#[must_use]
pub fn config(policy: SameKeyPolicy) -> StorefrontConfig {
    let mut config = StorefrontConfig::new(ApiConfig::new("http://localhost:5000").unwrap());
    config.same_key_policy = policy;
    config
}

/// Start a session for [`user`] over `mock`.
pub async fn session(mock: MockBackend, policy: SameKeyPolicy) -> (SessionContext, Notifier) {
    let notifier = Notifier::new();
    let session = SessionContext::start(Arc::new(mock), notifier.clone(), user(), policy).await;
    (session, notifier)
}
