//! Fixtures shared by unit tests.

#![allow(clippy::unwrap_used)]

use farmgate_core::UserId;
use serde_json::json;

use crate::api::{ApiError, Cart, Product};

pub fn user_id() -> UserId {
    UserId::new("u1")
}

pub fn api_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Api {
        status,
        message: message.map(str::to_owned),
    }
}

pub fn product(id: &str, price: &str, discount: &str) -> Product {
    serde_json::from_value(json!({
        "_id": id,
        "name": format!("Product {id}"),
        "price": price,
        "discount": discount,
        "stock": 100,
        "user": {"userId": {"_id": "seller1"}, "userName": "Seller One", "email": "seller@farm.rw"}
    }))
    .unwrap()
}

/// A cart for [`user_id`] with `(product, price, discount, quantity)` lines.
pub fn cart_with(lines: &[(&str, &str, &str, i64)]) -> Cart {
    let items: Vec<_> = lines
        .iter()
        .enumerate()
        .map(|(i, (id, price, discount, quantity))| {
            json!({
                "_id": format!("line{i}"),
                "product": product(id, price, discount),
                "quantity": quantity,
            })
        })
        .collect();

    serde_json::from_value::<Cart>(json!({"_id": "c1", "user": "u1", "items": items}))
        .unwrap()
        .normalized()
}
