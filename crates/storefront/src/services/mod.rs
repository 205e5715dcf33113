//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Login with optional OTP step, registration, logout, profile
//! - `catalog` - Products, categories, stats, search and sorting
//! - `orders` - Order request construction and order history
//! - `wishlist` - Session-scoped wishlist snapshot and actions

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod wishlist;
