//! Development server for the weft demo.
//!
//! Serves static files with the COOP/COEP headers that make the page
//! cross-origin isolated; without them the browser refuses to post shared
//! wasm memory to a worker and the bootstrap handshake cannot run.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() {
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let root = std::env::var("WEFT_ROOT").unwrap_or_else(|_| "apps/weft-demo/web".to_string());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = Router::new()
        .fallback_service(ServeDir::new(&root).precompressed_gzip().precompressed_br())
        .layer(ServiceBuilder::new().layer(middleware::from_fn(add_isolation_headers)));

    println!("weft dev server");
    println!("  root: {root}");
    println!("  url:  http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Add cross-origin isolation headers and fix MIME types.
async fn add_isolation_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    // Both are required before the browser exposes shared memory to the page.
    headers.insert(
        "Cross-Origin-Opener-Policy",
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        "Cross-Origin-Embedder-Policy",
        HeaderValue::from_static("require-corp"),
    );

    if let Some(content_type) = content_type_for(&path) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    response
}

/// MIME overrides for the file types the demo serves; anything else keeps
/// whatever the file service guessed.
fn content_type_for(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext)?;

    match extension {
        "js" | "mjs" => Some("application/javascript; charset=utf-8"),
        "wasm" => Some("application/wasm"),
        "html" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "json" => Some("application/json; charset=utf-8"),
        _ => None,
    }
}
