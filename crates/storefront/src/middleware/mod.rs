//! HTTP middleware for the storefront shell.

pub mod route_visibility;

pub use route_visibility::{RouteVisibility, route_visibility_middleware};
