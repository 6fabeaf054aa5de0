//! Cross-origin policy.
//!
//! With no configured origins every origin is allowed, which is what a
//! browser-side embedding proxy needs during development. Production
//! deployments should list their frontend origins explicitly.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer from configuration.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(Any);

    if config.allowed_origins.is_empty() {
        tracing::warn!("CORS: allowing any origin; set cors.allowed_origins in production");
        layer.allow_origin(Any)
    } else {
        tracing::debug!(origins = ?config.allowed_origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}
