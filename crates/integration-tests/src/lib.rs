//! Integration test support for the Ebasi storefront.
//!
//! [`FakeBackend`] is an in-process axum server that speaks the subset of the
//! backend REST API the storefront client uses. Tests point a real
//! [`ApiClient`] at it over loopback HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ebasi-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ebasi_storefront::api::ApiClient;
use ebasi_storefront::config::ApiConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Password every seeded account accepts.
pub const PASSWORD: &str = "correct-horse";

/// Timestamp stamped on every wishlist entry the fake creates.
const CREATED_AT: &str = "2026-03-01T10:15:00.123456Z";

#[derive(Debug)]
struct Account {
    id: i64,
    email: String,
    first_name: String,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    wishlists: HashMap<i64, Vec<Value>>,
    products: Vec<Value>,
    next_entry_id: i64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BackendState>,
    toggle_calls: AtomicUsize,
    wishlist_fetches: AtomicUsize,
    product_fetches: AtomicUsize,
    fail_toggles: AtomicBool,
}

impl Shared {
    fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<i64> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Token ")?;
        self.state().tokens.get(token).copied()
    }
}

/// Running fake backend. The server task stops when the runtime shuts down.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeBackend {
    /// Bind to an ephemeral loopback port and start serving.
    ///
    /// Seeds one account (`priya@ebasi.store`, user 5) and two products,
    /// `saree-a` (7) and `kurta-b` (8).
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        {
            let mut state = shared.state();
            state.accounts.push(Account {
                id: 5,
                email: "priya@ebasi.store".to_string(),
                first_name: "Priya".to_string(),
            });
            state.products = vec![
                json!({"id": 7, "name": "Saree A", "slug": "saree-a", "price": "2499.00",
                       "primary_image": "/media/saree-a.jpg", "stock_status": "in_stock"}),
                json!({"id": 8, "name": "Kurta B", "slug": "kurta-b", "price": "999.50",
                       "images": [{"image": "/media/kurta-b.jpg"}], "fabric": "cotton"}),
            ];
            state.next_entry_id = 100;
        }

        let app = Router::new()
            .route("/api/v1/accounts/login/", post(login))
            .route("/api/v1/accounts/profile/", get(profile))
            .route("/api/v1/accounts/logout/", post(logout))
            .route("/api/v1/orders/wishlist/", get(wishlist))
            .route("/api/v1/orders/wishlist/toggle/", post(toggle))
            .route("/api/v1/products/", get(products))
            .route("/api/v1/products/{slug}/", get(product))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, shared }
    }

    /// API root, with trailing slash.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1/", self.addr)).unwrap()
    }

    /// A client pointed at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.api_config()).unwrap()
    }

    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url(),
            timeout: None,
        }
    }

    /// Put a product on a user's server-side wishlist.
    pub fn seed_wishlist(&self, user_id: i64, product_id: i64) {
        let mut state = self.shared.state();
        insert_entry(&mut state, user_id, product_id);
    }

    /// Product ids on a user's server-side wishlist, in order.
    #[must_use]
    pub fn wishlist_product_ids(&self, user_id: i64) -> Vec<i64> {
        self.shared
            .state()
            .wishlists
            .get(&user_id)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["product_id"].as_i64())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of tokens currently valid.
    #[must_use]
    pub fn active_tokens(&self) -> usize {
        self.shared.state().tokens.len()
    }

    #[must_use]
    pub fn toggle_calls(&self) -> usize {
        self.shared.toggle_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn wishlist_fetches(&self) -> usize {
        self.shared.wishlist_fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_fetches(&self) -> usize {
        self.shared.product_fetches.load(Ordering::SeqCst)
    }

    /// Make every toggle answer 500 until switched back.
    pub fn fail_toggles(&self, fail: bool) {
        self.shared.fail_toggles.store(fail, Ordering::SeqCst);
    }
}

fn insert_entry(state: &mut BackendState, user_id: i64, product_id: i64) -> bool {
    let Some(product) = state
        .products
        .iter()
        .find(|p| p["id"].as_i64() == Some(product_id))
        .cloned()
    else {
        return false;
    };
    let id = state.next_entry_id;
    state.next_entry_id += 1;
    state.wishlists.entry(user_id).or_default().push(json!({
        "id": id,
        "product": product,
        "product_id": product_id,
        "created_at": CREATED_AT,
    }));
    true
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(State(shared): State<Arc<Shared>>, Json(body): Json<LoginRequest>) -> Response {
    let mut state = shared.state();
    let Some(user_id) = state
        .accounts
        .iter()
        .find(|a| a.email == body.email)
        .map(|a| a.id)
    else {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Invalid credentials"})))
            .into_response();
    };
    if body.password != PASSWORD {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Invalid credentials"})))
            .into_response();
    }

    let token = format!("tok-{user_id}-{}", state.tokens.len());
    state.tokens.insert(token.clone(), user_id);
    Json(json!({"token": token, "user_id": user_id, "email": body.email})).into_response()
}

async fn profile(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    let Some(user_id) = shared.user_for(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let state = shared.state();
    let Some(account) = state.accounts.iter().find(|a| a.id == user_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    Json(json!({
        "id": account.id,
        "email": account.email,
        "first_name": account.first_name,
        "last_name": "",
    }))
    .into_response()
}

async fn logout(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> StatusCode {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Token "))
        .map(String::from);
    match token {
        Some(token) if shared.state().tokens.remove(&token).is_some() => StatusCode::NO_CONTENT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn wishlist(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.wishlist_fetches.fetch_add(1, Ordering::SeqCst);
    let Some(user_id) = shared.user_for(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let items = shared
        .state()
        .wishlists
        .get(&user_id)
        .cloned()
        .unwrap_or_default();
    // Paginated shape, as DRF list views return it
    Json(json!({"count": items.len(), "next": null, "previous": null, "results": items}))
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    product_id: i64,
}

async fn toggle(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<ToggleRequest>,
) -> Response {
    shared.toggle_calls.fetch_add(1, Ordering::SeqCst);
    let Some(user_id) = shared.user_for(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if shared.fail_toggles.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "toggle failed").into_response();
    }

    let mut state = shared.state();
    let list = state.wishlists.entry(user_id).or_default();
    let before = list.len();
    list.retain(|item| item["product_id"].as_i64() != Some(body.product_id));
    if list.len() < before {
        return Json(json!({"status": "removed"})).into_response();
    }
    if insert_entry(&mut state, user_id, body.product_id) {
        (StatusCode::CREATED, Json(json!({"status": "added"}))).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn products(State(shared): State<Arc<Shared>>) -> Json<Value> {
    shared.product_fetches.fetch_add(1, Ordering::SeqCst);
    Json(Value::Array(shared.state().products.clone()))
}

async fn product(State(shared): State<Arc<Shared>>, Path(slug): Path<String>) -> Response {
    shared.product_fetches.fetch_add(1, Ordering::SeqCst);
    shared
        .state()
        .products
        .iter()
        .find(|p| p["slug"].as_str() == Some(slug.as_str()))
        .cloned()
        .map_or_else(
            || StatusCode::NOT_FOUND.into_response(),
            |p| Json(p).into_response(),
        )
}
