//! Per-request tracing context.
//!
//! Every request runs inside a span carrying a fresh UUID v4 request ID, so
//! all relay log lines for one call can be correlated. The ID lives in the
//! span only; it is never injected into the headers forwarded to the target.

use std::fmt;

use axum::body::Body;
use axum::http::Request;
use tracing::Span;
use uuid::Uuid;

/// Unique identifier for one proxied call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Span factory for `TraceLayer::make_span_with`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = RequestId::new();
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
