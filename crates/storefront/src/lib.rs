//! Farmgate Storefront library.
//!
//! Client-side state synchronization for the Farmgate marketplace: a typed
//! backend client, the cart reconciliation engine, wishlist, catalog, and
//! per-login session state. All business rules (pricing, stock, orders,
//! authentication) are owned by the backend; this crate keeps local
//! snapshots in step with it.
//!
//! # Modules
//!
//! - [`api`] - Backend REST client behind the mockable [`api::Backend`] trait
//! - [`cart`] - Snapshot, mutation dispatcher, busy tracking, reconciler
//! - [`services`] - Auth, catalog, orders, wishlist
//! - [`session`] - Per-login [`session::SessionContext`]
//! - [`state`] - [`state::Storefront`], the entry point for front ends

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod notify;
pub mod services;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use state::{LoginOutcome, Storefront};
