//! Farmgate Core - Shared types library.
//!
//! This crate provides common types used across all Farmgate components:
//! - `storefront` - Backend client, cart reconciliation, session state
//! - `cli` - Command-line front end for the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and discounts, emails, statuses, and
//!   lenient numeric decoding for backend payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
