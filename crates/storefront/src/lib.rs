//! Ebasi storefront client state.
//!
//! Cart and wishlist state containers over local device storage and the
//! storefront backend API, plus the shell server that gates unreleased
//! sections of the site.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod app;
pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod wishlist;

pub use app::Storefront;
pub use error::{Result, StorefrontError};
