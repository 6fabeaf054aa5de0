//! Header policy in both directions.
//!
//! # Outbound (caller → target)
//! Hop-by-hop headers are dropped, `host` is re-derived from the target URL,
//! `cookie` is dropped so the caller's session never reaches third parties,
//! and client-identity headers are not disclosed.
//!
//! # Inbound (target → caller)
//! Length and encoding headers no longer describe the re-chunked, decoded
//! body. `set-cookie` is dropped rather than rewritten. Finally the
//! headers that forbid framing are removed so the page can be embedded.

use axum::http::header::{HeaderMap, HeaderName, CONTENT_SECURITY_POLICY, X_FRAME_OPTIONS};

/// Inbound request headers never forwarded to the target.
pub const REQUEST_EXCLUDED: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "x-forwarded-for",
    "x-real-ip",
    "cookie",
];

/// Target response headers never returned to the caller.
pub const RESPONSE_EXCLUDED: &[&str] = &[
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "connection",
    "set-cookie",
];

/// Headers that would stop the relayed page from being framed.
pub const EMBEDDING_BLOCKERS: [HeaderName; 2] = [X_FRAME_OPTIONS, CONTENT_SECURITY_POLICY];

fn is_listed(name: &HeaderName, list: &[&str]) -> bool {
    list.iter().any(|excluded| name.as_str().eq_ignore_ascii_case(excluded))
}

fn copy_except(source: &HeaderMap, list: &[&str]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if !is_listed(name, list) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Headers to send to the target.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    copy_except(inbound, REQUEST_EXCLUDED)
}

/// Headers to return to the caller, with embedding permitted.
pub fn caller_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = copy_except(upstream, RESPONSE_EXCLUDED);
    allow_embedding(&mut headers);
    headers
}

/// Remove `X-Frame-Options` and `Content-Security-Policy`, whatever their value.
pub fn allow_embedding(headers: &mut HeaderMap) {
    for name in &EMBEDDING_BLOCKERS {
        headers.remove(name);
    }
}
