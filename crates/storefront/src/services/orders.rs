//! Order construction and history.

use farmgate_core::UserId;
use tracing::{instrument, warn};

use crate::api::{
    Backend, Cart, Order, OrderCreator, PlaceOrderItem, PlaceOrderRequest, ProductOwner,
    UserAddress, types::non_blank,
};

const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_EMAIL: &str = "unknown@example.com";

impl OrderCreator {
    /// Normalize a product owner into the creator record the backend requires.
    ///
    /// Missing fields fall back to `Unknown`, `unknown@example.com`, an empty
    /// phone and an empty address.
    #[must_use]
    pub fn from_owner(owner: Option<&ProductOwner>) -> Self {
        let Some(owner) = owner else {
            return Self {
                user_id: None,
                user_name: UNKNOWN_NAME.to_string(),
                email: UNKNOWN_EMAIL.to_string(),
                phone: String::new(),
                address: UserAddress::default(),
            };
        };

        Self {
            user_id: owner.user_ref().map(str::to_owned),
            user_name: non_blank(owner.user_name.as_deref())
                .or_else(|| non_blank(owner.name.as_deref()))
                .unwrap_or(UNKNOWN_NAME)
                .to_string(),
            email: non_blank(owner.email.as_deref())
                .unwrap_or(UNKNOWN_EMAIL)
                .to_string(),
            phone: non_blank(owner.phone.as_deref()).unwrap_or_default().to_string(),
            address: owner.address.clone().unwrap_or_default(),
        }
    }
}

/// Build the place-order request for every line of `cart`.
#[must_use]
pub fn build_order_request(
    user: &UserId,
    cart: &Cart,
    delivery_address: Option<UserAddress>,
) -> PlaceOrderRequest {
    let items = cart
        .items
        .iter()
        .map(|line| PlaceOrderItem {
            product_id: line.product.id.clone(),
            quantity: line.quantity,
            creator: OrderCreator::from_owner(line.product.user.as_ref()),
        })
        .collect();

    PlaceOrderRequest {
        user_id: user.clone(),
        items,
        delivery_address: delivery_address.filter(|address| !address.is_empty()),
    }
}

/// A user's order history, newest first.
///
/// Failures degrade to an empty history and are logged.
#[instrument(skip(backend), fields(user = %user))]
pub async fn history(backend: &dyn Backend, user: &UserId) -> Vec<Order> {
    match backend.user_orders(user).await {
        Ok(mut orders) => {
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch orders");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::{MockBackend, Product};
    use crate::test_support::{api_error, cart_with, user_id};

    #[test]
    fn test_creator_fallbacks() {
        let owner = ProductOwner {
            id: Some("seller9".to_string()),
            ..ProductOwner::default()
        };
        let creator = OrderCreator::from_owner(Some(&owner));

        let value = serde_json::to_value(&creator).unwrap();
        assert_eq!(
            value,
            json!({
                "userId": "seller9",
                "userName": "Unknown",
                "email": "unknown@example.com",
                "phone": "",
                "address": {}
            })
        );
    }

    #[test]
    fn test_creator_prefers_user_name_then_name() {
        let owner = ProductOwner {
            name: Some("Farm Coop".to_string()),
            email: Some("coop@farm.rw".to_string()),
            ..ProductOwner::default()
        };
        let creator = OrderCreator::from_owner(Some(&owner));
        assert_eq!(creator.user_name, "Farm Coop");
        assert_eq!(creator.email, "coop@farm.rw");
        assert!(creator.user_id.is_none());

        let creator = OrderCreator::from_owner(None);
        assert_eq!(creator.user_name, "Unknown");
    }

    #[test]
    fn test_creator_from_unpopulated_owner() {
        let product: Product =
            serde_json::from_value(json!({"_id": "p1", "user": "seller-1"})).unwrap();
        let creator = OrderCreator::from_owner(product.user.as_ref());

        assert_eq!(creator.user_id.as_deref(), Some("seller-1"));
        assert_eq!(creator.user_name, "Unknown");
        assert_eq!(creator.email, "unknown@example.com");
    }

    #[test]
    fn test_build_order_request() {
        let cart = cart_with(&[("p1", "10", "20", 2), ("p2", "4", "0", 1)]);
        let request = build_order_request(&user_id(), &cart, Some(UserAddress::default()));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["items"][0]["productId"], "p1");
        assert_eq!(value["items"][0]["quantity"], 2);
        assert_eq!(value["items"][0]["creator"]["userId"], "seller1");
        assert_eq!(value["items"][1]["creator"]["userName"], "Seller One");
        assert!(value.get("deliveryAddress").is_none());
    }

    #[tokio::test]
    async fn test_history_sorted_and_degrades() {
        let mut mock = MockBackend::new();
        mock.expect_user_orders().times(1).returning(|_| {
            Ok(serde_json::from_value(json!([
                {"_id": "old", "createdAt": "2024-01-01T00:00:00Z"},
                {"_id": "new", "createdAt": "2024-06-01T00:00:00Z"}
            ]))
            .unwrap())
        });
        let orders = history(&mock, &user_id()).await;
        assert_eq!(orders[0].id.as_str(), "new");

        let mut failing = MockBackend::new();
        failing
            .expect_user_orders()
            .returning(|_| Err(api_error(500, None)));
        assert!(history(&failing, &user_id()).await.is_empty());
    }
}
