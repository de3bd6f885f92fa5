//! Ebasi storefront shell.
//!
//! Serves the static storefront pages with the route visibility gate in front
//! of them, plus health checks. Cart and wishlist state live on the client and
//! talk to the backend API directly; this binary never touches them.

#![cfg_attr(not(test), forbid(unsafe_code))]

use ebasi_storefront::api::ApiClient;
use ebasi_storefront::config::StorefrontConfig;
use ebasi_storefront::{StorefrontError, error, routes, telemetry};

#[tokio::main]
async fn main() -> Result<(), StorefrontError> {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    serve(&config).await.inspect_err(error::report)
}

/// Build the router and serve until a shutdown signal arrives.
async fn serve(config: &StorefrontConfig) -> Result<(), StorefrontError> {
    let api = ApiClient::new(&config.api)?;
    tracing::info!(
        api = %api.base_url(),
        pages = %config.pages_dir.display(),
        hidden_routes = config.hidden_routes.len(),
        "Configuration loaded"
    );

    let app = routes::router(config, api);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(StorefrontError::Server)?;
    tracing::info!("storefront listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StorefrontError::Server)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
