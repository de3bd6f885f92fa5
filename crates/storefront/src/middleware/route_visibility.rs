//! Route visibility gate.
//!
//! Storefront sections that are built but not yet launched stay on disk and
//! are hidden here: any page request under a hidden prefix is redirected to
//! the homepage. Remove a prefix from the list to re-enable its section.
//!
//! API calls, static assets, and anything that looks like a file (a `.` in the
//! path) bypass the gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Route prefixes hidden by default.
pub const DEFAULT_HIDDEN_ROUTES: &[&str] = &[
    // E-commerce
    "/cart",
    "/checkout",
    "/order-confirmation",
    "/orders",
    "/track-order",
    // Auth
    "/login",
    "/signup",
    "/forgot-password",
    "/auth",
    "/account",
    // Social
    "/wishlist",
    "/compare",
    "/reviews",
    // Collections
    "/collections",
    "/saree",
    "/women",
    "/products",
    // Programs
    "/admin",
    "/affiliate",
    "/loyalty",
    "/gift-cards",
    "/waitlist",
    "/wholesale",
    // Support & misc
    "/blog",
    "/stores",
    "/returns",
    "/support",
    "/test",
    // Extra policies
    "/faq",
    "/accessibility",
    "/gdpr",
    "/cookie-policy",
    "/size-guide",
];

/// Path prefixes that never go through the gate.
const BYPASS_PREFIXES: &[&str] = &["/api", "/static", "/favicon.ico"];

/// A set of hidden route prefixes.
#[derive(Debug, Clone)]
pub struct RouteVisibility {
    hidden: Arc<[String]>,
}

impl Default for RouteVisibility {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN_ROUTES.iter().map(|r| (*r).to_string()))
    }
}

impl RouteVisibility {
    /// Build a gate from route prefixes such as `/cart`.
    pub fn new(hidden: impl IntoIterator<Item = String>) -> Self {
        Self {
            hidden: hidden.into_iter().collect(),
        }
    }

    /// The configured prefixes.
    #[must_use]
    pub fn hidden_routes(&self) -> &[String] {
        &self.hidden
    }

    /// Whether `path` equals a hidden prefix or sits below one.
    ///
    /// Matching is by whole segment: `/cart` hides `/cart/items` but not
    /// `/cartography`.
    #[must_use]
    pub fn is_hidden(&self, path: &str) -> bool {
        self.hidden.iter().any(|route| {
            path.strip_prefix(route.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Whether the gate applies to `path` at all.
    #[must_use]
    pub fn is_gated(path: &str) -> bool {
        let bypassed = BYPASS_PREFIXES.iter().any(|prefix| {
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });
        !bypassed && !path.contains('.')
    }
}

/// Middleware that redirects hidden page routes to `/`.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn route_visibility_middleware(
    State(visibility): State<RouteVisibility>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if RouteVisibility::is_gated(path) && visibility.is_hidden(path) {
        tracing::debug!(path = %path, "Redirecting hidden route");
        return Redirect::temporary("/").into_response();
    }
    next.run(request).await
}
