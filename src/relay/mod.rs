//! Relay subsystem: the request-forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest (method, query, headers, body)
//!     → target.rs (resolve `url`, normalize scheme, re-attach query)
//!     → headers.rs (drop hop-by-hop / identity headers)
//!     → reqwest (follow redirects, bounded wait for response head)
//!     → headers.rs (drop length/encoding/cookie headers, allow embedding)
//!     → stream.rs (chunked body relay)
//!     → Response to caller
//! ```
//!
//! # Design Decisions
//! - Stateless per request; the only shared value is the pooled client
//! - A single attempt per request, no retries
//! - The deadline covers the response head only, not the body

pub mod headers;
pub mod stream;
pub mod target;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use reqwest::redirect::Policy;
use url::form_urlencoded;

use crate::config::UpstreamConfig;
use crate::error::{RelayError, RelayResult};

pub use stream::RelayStream;

/// An inbound proxy call, decoupled from the HTTP framework.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Decoded query pairs in arrival order, duplicates kept.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, raw_query: Option<&str>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            query: parse_query(raw_query),
            headers,
            body,
        }
    }
}

/// Decode a raw query string into ordered pairs.
pub fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// The Relay Handler.
#[derive(Debug, Clone)]
pub struct Relay {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl Relay {
    /// Build the outbound client from configuration.
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(config.timeout());

        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Relay one request to its target and stream the answer back.
    pub async fn forward(&self, inbound: InboundRequest) -> RelayResult<Response> {
        let target = target::normalize_scheme(target::resolve_target(&inbound.query)?);

        tracing::info!(
            method = %inbound.method,
            target_url = %target,
            "Proxying request"
        );

        let query = target::forwarded_query(&inbound.query, self.config.strip_target_param);
        let url = target::build_target_url(&target, &query)?;

        let mut request = self
            .client
            .request(inbound.method, url)
            .headers(headers::outbound_headers(&inbound.headers));
        if !inbound.body.is_empty() {
            request = request.body(inbound.body);
        }

        let deadline = self.config.timeout();
        let upstream = match tokio::time::timeout(deadline, request.send()).await {
            Ok(result) => result?,
            Err(_) => return Err(RelayError::UpstreamTimeout(deadline)),
        };

        let status = upstream.status();
        tracing::debug!(
            status = status.as_u16(),
            final_url = %upstream.url(),
            "Target responded"
        );

        let headers = headers::caller_headers(upstream.headers());
        let body = RelayStream::new(
            upstream.bytes_stream(),
            self.config.chunk_size,
            self.config.stall_timeout(),
            target,
        );

        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
