//! Ebasi Core - Shared domain types.
//!
//! Types shared by the storefront state layer and its tests:
//! - typed ids for products, users and wishlist entries
//! - [`Price`] backed by `rust_decimal`
//! - [`Product`], the catalog snapshot stored in carts and wishlists
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
