//! REST client for the storefront backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for accounts and authenticated
//!   wishlists; this client does no local sync of its own
//! - Catalog reads (products) are cached in-memory via `moka` (5 minute TTL)
//! - Auth uses DRF token auth: `Authorization: Token <token>`
//!
//! # Endpoints
//!
//! ```text
//! GET  /orders/wishlist/          - Wishlist for the token's user
//! POST /orders/wishlist/toggle/   - Add or remove {product_id}
//! POST /accounts/login/           - Exchange credentials for a token
//! GET  /accounts/profile/         - Profile for the token's user
//! POST /accounts/logout/          - Invalidate the token
//! GET  /products/                 - Product listing
//! GET  /products/{slug}/          - Product detail
//! ```

mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use ebasi_core::{Email, Product, ProductId};
use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ApiConfig;
use crate::session::Identity;
use crate::wishlist::{WishlistItem, WishlistRemote};

use cache::{CacheKey, CacheValue};
use types::{Listing, LoginResponse, Profile, ToggleWishlistRequest};

/// Longest slice of a response body kept for logs and errors.
const MAX_BODY_EXCERPT: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token is missing, expired, or lacks permission.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Client for the storefront backend API.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialisation failure).
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// The base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn authorized(request: RequestBuilder, token: &SecretString) -> RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", token.expose_secret()),
        )
    }

    /// Send a request and map non-success statuses to errors.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_BODY_EXCERPT)
            .collect();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url)),
            _ => {
                tracing::error!(
                    status = %status,
                    url = %url,
                    body = %body,
                    "Backend returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let text = self.send(request).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(MAX_BODY_EXCERPT).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Fetch the full wishlist of the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn get_wishlist(&self, identity: &Identity) -> Result<Vec<WishlistItem>, ApiError> {
        let url = self.endpoint("orders/wishlist/")?;
        let request = Self::authorized(self.inner.client.get(url), identity.token());
        let listing: Listing<WishlistItem> = self.send_json(request).await?;
        Ok(listing.into_items())
    }

    /// Flip membership of `product_id` on the server.
    ///
    /// The server decides between add and remove; the response body is
    /// ignored and callers refetch to learn the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn toggle_wishlist(
        &self,
        identity: &Identity,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("orders/wishlist/toggle/")?;
        let body = ToggleWishlistRequest {
            product_id: product_id.as_i64(),
        };
        let request = Self::authorized(self.inner.client.post(url), identity.token()).json(&body);
        self.send(request).await?;
        Ok(())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Exchange credentials for an auth token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for rejected credentials (the
    /// backend may also answer 400), or a transport error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint("accounts/login/")?;
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        self.send_json(self.inner.client.post(url).json(&body)).await
    }

    /// Fetch the profile for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is no longer valid.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &SecretString) -> Result<Profile, ApiError> {
        let url = self.endpoint("accounts/profile/")?;
        self.send_json(Self::authorized(self.inner.client.get(url), token))
            .await
    }

    /// Invalidate a token on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
        let url = self.endpoint("accounts/logout/")?;
        self.send(Self::authorized(self.inner.client.post(url), token))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let url = self.endpoint("products/")?;
        let listing: Listing<Product> = self.send_json(self.inner.client.get(url)).await?;
        let products = Arc::new(listing.into_items());

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if no product has this slug.
    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, ApiError> {
        let key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{}/", urlencode_segment(slug)))?;
        let product: Product = self.send_json(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Drop all cached catalog responses.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl WishlistRemote for ApiClient {
    async fn fetch_wishlist(&self, identity: &Identity) -> Result<Vec<WishlistItem>, ApiError> {
        self.get_wishlist(identity).await
    }

    async fn toggle_membership(
        &self,
        identity: &Identity,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.toggle_wishlist(identity, product_id).await
    }
}

/// Percent-encode a single path segment.
fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("http://127.0.0.1:8000/api/v1/");
        assert_eq!(
            api.endpoint("orders/wishlist/").unwrap().as_str(),
            "http://127.0.0.1:8000/api/v1/orders/wishlist/"
        );
    }

    #[test]
    fn test_urlencode_segment() {
        assert_eq!(urlencode_segment("silk saree/red"), "silk%20saree%2Fred");
        assert_eq!(urlencode_segment("plain-slug"), "plain-slug");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
        assert_eq!(ApiError::Unauthorized.to_string(), "Unauthorized");
    }
}
