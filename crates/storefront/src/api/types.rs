//! Domain types for the marketplace backend API.
//!
//! Field names follow the backend's JSON (camelCase, `_id` keys). Numeric
//! fields are decoded leniently, see [`farmgate_core::lenient`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use farmgate_core::lenient;
use farmgate_core::{
    CartId, CartLineId, CategoryId, OrderId, OrderStatus, PaymentMethod, PriceTag, ProductId,
    UserId, WishlistId, effective_price,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// =============================================================================
// References
// =============================================================================

/// A reference to another document: either its bare id or the populated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// Bare identifier.
    Id(String),
    /// Populated document; only the id is kept.
    Document {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl EntityRef {
    /// The referenced id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Document { id } => id,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// Postal address in the administrative hierarchy used by the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
}

impl UserAddress {
    /// Join the non-empty parts, largest region first (e.g., `Gasabo, Remera`).
    ///
    /// Returns `None` when no part is set.
    #[must_use]
    pub fn formatted(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.district, &self.sector, &self.cell, &self.village]
            .into_iter()
            .filter_map(|part| part.as_deref().map(str::trim))
            .filter(|part| !part.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }

    /// Whether no part of the address is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formatted().is_none()
    }
}

/// An authenticated storefront user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<UserAddress>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Login credentials.
///
/// The password is held as a secret and only exposed while serializing the
/// request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

/// Registration form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub address: String,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Response from `POST /api/auth/login`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The backend sent a one-time password and wants it verified first.
    #[serde(default)]
    pub requires_otp: bool,
    /// The logged-in user, when no OTP step is required.
    #[serde(default)]
    pub user: Option<User>,
}

/// Partial profile update; unset fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<UserAddress>,
}

impl ProfileUpdate {
    /// Whether the update carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.user_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// The seller who listed a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityRef>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<UserAddress>,
}

impl ProductOwner {
    /// The seller's user id, preferring the explicit `userId` reference.
    #[must_use]
    pub fn user_ref(&self) -> Option<&str> {
        self.user_id
            .as_ref()
            .map(EntityRef::id)
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Seller name for product listings: `userName`, else the email's local
    /// part, else `Unknown Seller`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = non_blank(self.user_name.as_deref()) {
            return name.to_string();
        }
        if let Some(email) = non_blank(self.email.as_deref()) {
            return email.split('@').next().unwrap_or(email).to_string();
        }
        "Unknown Seller".to_string()
    }

    /// Seller phone formatted for display, if known.
    #[must_use]
    pub fn display_phone(&self) -> Option<String> {
        non_blank(self.phone.as_deref()).map(format_phone)
    }
}

/// Decode `Product.user`, which is a bare seller id when the backend skips
/// populating it. Shapes that match neither decode as no owner.
fn owner<'de, D>(deserializer: D) -> Result<Option<ProductOwner>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(ProductOwner {
            id: Some(id),
            ..ProductOwner::default()
        }),
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Format a phone number as `(XXX) XXX-XXXX` when it has exactly ten digits.
///
/// Anything else is returned unchanged.
#[must_use]
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match (digits.get(0..3), digits.get(3..6), digits.get(6..)) {
        (Some(area), Some(prefix), Some(line)) if digits.len() == 10 => {
            format!("({area}) {prefix}-{line}")
        }
        _ => phone.to_string(),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A product listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Base unit price.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    /// Unit label (e.g., `kg`, `bag`).
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub stock: u32,
    /// Discount percentage.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub discount: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub rating: Decimal,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "owner")]
    pub user: Option<ProductOwner>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Unit price after discount.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.discount)
    }

    /// Display price (effective, plus original when discounted).
    #[must_use]
    pub fn price_tag(&self) -> PriceTag {
        PriceTag::new(self.price, self.discount)
    }

    /// Whether the product is flagged for the home page.
    #[must_use]
    pub fn is_featured(&self) -> bool {
        self.featured.unwrap_or(false)
    }

    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub item_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Aggregate catalog numbers shown on the home page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub out_of_stock: u32,
    /// Per-category breakdown; the shape is owned by the backend.
    #[serde(default)]
    pub category_stats: Vec<Value>,
}

// =============================================================================
// Cart
// =============================================================================

/// One product+quantity pairing within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "_id", default)]
    pub id: Option<CartLineId>,
    pub product: Product,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub quantity: i64,
}

impl CartLine {
    /// Effective unit price times quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .effective_price()
            .saturating_mul(Decimal::from(self.quantity.max(0)))
    }
}

/// A user's cart as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(rename = "_id", default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub user: Option<EntityRef>,
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// An empty cart for a user who has not added anything yet.
    #[must_use]
    pub fn empty_for(user: &UserId) -> Self {
        Self {
            user: Some(EntityRef::Id(user.to_string())),
            ..Self::default()
        }
    }

    /// Enforce the line invariants: quantities are positive and each product
    /// appears at most once (the first occurrence wins).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = HashSet::new();
        let before = self.items.len();

        self.items
            .retain(|line| line.quantity > 0 && seen.insert(line.product.id.clone()));

        if self.items.len() != before {
            tracing::warn!(
                dropped = before - self.items.len(),
                "Dropped non-positive or duplicate cart lines from backend response"
            );
        }
        self
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product: &ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| &line.product.id == product)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body of `POST /api/cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAdjustment {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Signed quantity delta; the backend owns the absolute value.
    pub quantity: i64,
}

// =============================================================================
// Wishlist
// =============================================================================

/// A user's wishlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    #[serde(rename = "_id", default)]
    pub id: Option<WishlistId>,
    #[serde(default)]
    pub user: Option<EntityRef>,
    #[serde(default)]
    pub items: Vec<Product>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wishlist {
    /// An empty wishlist for a user.
    #[must_use]
    pub fn empty_for(user: &UserId) -> Self {
        Self {
            user: Some(EntityRef::Id(user.to_string())),
            ..Self::default()
        }
    }

    /// Drop duplicate product entries, keeping the first.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = HashSet::new();
        self.items.retain(|product| seen.insert(product.id.clone()));
        self
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Seller details copied onto each order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: UserAddress,
}

/// Product details captured by the backend when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// The live product; `None` if it has since been deleted.
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub quantity: i64,
    #[serde(default)]
    pub product_details: Option<ProductDetails>,
    #[serde(default)]
    pub creator: Option<OrderCreator>,
}

impl OrderItem {
    /// Unit price for display: the captured price, else the live product's
    /// price, else zero.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.product_details
            .as_ref()
            .map(|details| details.price)
            .filter(|price| !price.is_zero())
            .or_else(|| self.product.as_ref().map(|product| product.price))
            .unwrap_or(Decimal::ZERO)
    }

    /// Product name for display.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.product_details
            .as_ref()
            .map(|details| details.name.as_str())
            .filter(|name| !name.is_empty())
            .or_else(|| self.product.as_ref().map(|product| product.name.as_str()))
            .unwrap_or("Unknown product")
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub user: Option<EntityRef>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub delivery_address: Option<UserAddress>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub creator: OrderCreator,
}

/// Body of `POST /api/orders/place`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: UserId,
    pub items: Vec<PlaceOrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<UserAddress>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_product_with_garbage_numbers() -> TestResult {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Beans",
            "price": "n/a",
            "discount": null,
            "stock": "12",
        }))?;

        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.discount, Decimal::ZERO);
        assert_eq!(product.stock, 12);
        assert_eq!(product.effective_price(), Decimal::ZERO);
        assert!(!product.is_featured());
        Ok(())
    }

    #[test]
    fn test_owner_reference_shapes() -> TestResult {
        let populated: ProductOwner =
            serde_json::from_value(json!({"userId": {"_id": "u1", "userName": "Aline"}}))?;
        assert_eq!(populated.user_ref(), Some("u1"));

        let bare: ProductOwner = serde_json::from_value(json!({"_id": "u2"}))?;
        assert_eq!(bare.user_ref(), Some("u2"));

        let none = ProductOwner::default();
        assert_eq!(none.user_ref(), None);
        Ok(())
    }

    #[test]
    fn test_unpopulated_product_owner() -> TestResult {
        let cart: Cart = serde_json::from_value(json!({
            "_id": "c1",
            "user": "u1",
            "items": [
                {"product": {"_id": "p1", "price": 500, "user": "seller-1"}, "quantity": 1},
                {"product": {"_id": "p2", "price": 200, "user": 42}, "quantity": 2},
                {"product": {"_id": "p3", "price": 100, "user": null}, "quantity": 1}
            ]
        }))?;

        let owners: Vec<Option<&ProductOwner>> =
            cart.items.iter().map(|line| line.product.user.as_ref()).collect();
        let [Some(bare), None, None] = owners.as_slice() else {
            panic!("unexpected owners: {owners:?}");
        };
        assert_eq!(bare.user_ref(), Some("seller-1"));
        assert_eq!(bare.display_name(), "Unknown Seller");
        assert_eq!(cart.items.len(), 3);
        Ok(())
    }

    #[test]
    fn test_owner_display_name_fallbacks() {
        let mut owner = ProductOwner {
            user_name: Some("Aline".to_string()),
            email: Some("aline@farm.rw".to_string()),
            ..ProductOwner::default()
        };
        assert_eq!(owner.display_name(), "Aline");

        owner.user_name = Some("  ".to_string());
        assert_eq!(owner.display_name(), "aline");

        owner.email = None;
        assert_eq!(owner.display_name(), "Unknown Seller");
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("0788123456"), "(078) 812-3456");
        assert_eq!(format_phone("078-812-3456"), "(078) 812-3456");
        assert_eq!(format_phone("+250788123456"), "+250788123456");
    }

    #[test]
    fn test_address_formatting() {
        let address = UserAddress {
            district: Some("Gasabo".to_string()),
            sector: Some(String::new()),
            cell: Some("Nyabisindu".to_string()),
            village: None,
        };
        assert_eq!(address.formatted().as_deref(), Some("Gasabo, Nyabisindu"));
        assert!(UserAddress::default().is_empty());
    }

    #[test]
    fn test_cart_normalization() -> TestResult {
        let cart: Cart = serde_json::from_value(json!({
            "_id": "c1",
            "user": "u1",
            "items": [
                {"_id": "l1", "product": {"_id": "p1", "price": 10}, "quantity": 2},
                {"_id": "l2", "product": {"_id": "p2", "price": 5}, "quantity": 0},
                {"_id": "l3", "product": {"_id": "p1", "price": 10}, "quantity": 4},
                {"_id": "l4", "product": {"_id": "p3", "price": 1}, "quantity": -1}
            ]
        }))?;

        let cart = cart.normalized();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line(&ProductId::new("p1")).map(|l| l.quantity), Some(2));
        assert_eq!(cart.user.as_ref().map(EntityRef::id), Some("u1"));
        Ok(())
    }

    #[test]
    fn test_credentials_serialize_password() -> TestResult {
        let credentials = Credentials {
            email: "a@b.rw".to_string(),
            password: SecretString::from("hunter22"),
        };
        let value = serde_json::to_value(&credentials)?;
        assert_eq!(value, json!({"email": "a@b.rw", "password": "hunter22"}));
        assert!(!format!("{credentials:?}").contains("hunter22"));
        Ok(())
    }

    #[test]
    fn test_order_decoding() -> TestResult {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "user": "u1",
            "items": [{"product": null, "quantity": 2, "productDetails": {"name": "Maize", "price": 3.5}}],
            "totalAmount": "7",
            "status": "confirmed",
            "paymentMethod": "COD"
        }))?;

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(order.total_amount, Decimal::new(7, 0));
        assert!(order.delivery_address.is_none());
        assert_eq!(order.items[0].unit_price(), Decimal::new(35, 1));
        assert_eq!(order.items[0].display_name(), "Maize");
        Ok(())
    }
}
