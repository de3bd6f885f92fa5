//! The shell server over a real socket.

#![allow(clippy::unwrap_used)]

use ebasi_integration_tests::FakeBackend;
use ebasi_storefront::config::StorefrontConfig;
use ebasi_storefront::routes;

async fn spawn_shell(backend: &FakeBackend, pages: &std::path::Path) -> std::net::SocketAddr {
    let vars = [
        ("EBASI_API_BASE_URL", backend.base_url().to_string()),
        ("EBASI_PAGES_DIR", pages.to_string_lossy().into_owned()),
        ("EBASI_HIDDEN_ROUTES", "/cart,/wishlist".to_string()),
    ];
    let config = StorefrontConfig::from_lookup(|key| {
        vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    })
    .unwrap();
    let app = routes::router(&config, backend.client());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_ready_when_backend_answers() {
    let backend = FakeBackend::start().await;
    let pages = tempfile::tempdir().unwrap();
    let addr = spawn_shell(&backend, pages.path()).await;

    let response = raw_get(addr, "/health/ready").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
}

#[tokio::test]
async fn test_configured_routes_are_gated() {
    let backend = FakeBackend::start().await;
    let pages = tempfile::tempdir().unwrap();
    std::fs::write(pages.path().join("index.html"), "<h1>Ebasi</h1>").unwrap();
    std::fs::create_dir(pages.path().join("blog")).unwrap();
    std::fs::write(pages.path().join("blog").join("index.html"), "blog").unwrap();
    let addr = spawn_shell(&backend, pages.path()).await;

    let response = raw_get(addr, "/wishlist").await;
    assert!(response.starts_with("HTTP/1.1 307"), "{response}");
    assert!(response.to_ascii_lowercase().contains("location: /\r\n"));

    // Not in the configured list, so served even though hidden by default
    let response = raw_get(addr, "/blog/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("blog"));
}
