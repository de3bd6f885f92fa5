//! HTTP routes for the storefront shell.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachable)
//! GET  /*                      - Static pages from the pages directory
//! ```
//!
//! Every page request passes the route visibility gate first; hidden
//! sections redirect to `/`.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::middleware::{RouteVisibility, route_visibility_middleware};

/// Build the shell router.
pub fn router(config: &StorefrontConfig, api: ApiClient) -> Router {
    let visibility = RouteVisibility::new(config.hidden_routes.iter().cloned());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .fallback_service(ServeDir::new(&config.pages_dir))
        .with_state(api)
        .layer(middleware::from_fn_with_state(
            visibility,
            route_visibility_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the backend answers the product listing. Returns 503 Service
/// Unavailable otherwise.
async fn readiness(State(api): State<ApiClient>) -> StatusCode {
    match api.list_products().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn config(pages: &std::path::Path, backend: &str) -> StorefrontConfig {
        let vars = [
            ("EBASI_PAGES_DIR", pages.to_string_lossy().into_owned()),
            ("EBASI_API_BASE_URL", backend.to_string()),
        ];
        StorefrontConfig::from_lookup(|key| {
            vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn app(pages: &std::path::Path, backend: &str) -> Router {
        let config = config(pages, backend);
        let api = ApiClient::new(&config.api).unwrap();
        router(&config, api)
    }

    async fn get_path(router: Router, path: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let pages = tempfile::tempdir().unwrap();
        let response = get_path(app(pages.path(), "http://127.0.0.1:9/"), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serves_visible_page_and_gates_hidden_one() {
        let pages = tempfile::tempdir().unwrap();
        std::fs::write(pages.path().join("index.html"), "<h1>Ebasi</h1>").unwrap();
        std::fs::create_dir(pages.path().join("cart")).unwrap();
        std::fs::write(pages.path().join("cart").join("index.html"), "cart").unwrap();

        let response = get_path(app(pages.path(), "http://127.0.0.1:9/"), "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_path(app(pages.path(), "http://127.0.0.1:9/"), "/cart/").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let pages = tempfile::tempdir().unwrap();
        let response = get_path(app(pages.path(), "http://127.0.0.1:9/"), "/about").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_readiness_fails_without_backend() {
        let pages = tempfile::tempdir().unwrap();
        // Port 9 (discard) is not listening.
        let response = get_path(app(pages.path(), "http://127.0.0.1:9/"), "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
