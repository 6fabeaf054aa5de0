//! Error types for the relay request path.
//!
//! Every variant maps to a plain-text response. Callers distinguish failures by
//! status code only; there is no structured error body.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

const UPSTREAM_PREFIX: &str =
    "Proxy Error: Could not reach the target website or an internal error occurred";

/// Errors raised while relaying a single request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The `url` query parameter was absent or empty.
    #[error("Missing target URL. Please provide a `url` query parameter.")]
    MissingTargetUrl,

    /// The normalized target could not be parsed as an absolute URL.
    #[error("{}: invalid target URL `{target}`: {source}", UPSTREAM_PREFIX)]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    /// The target could not be reached (DNS, connect, TLS, redirect loop, ...).
    #[error("{}: {}", UPSTREAM_PREFIX, error_chain(.0))]
    Upstream(#[from] reqwest::Error),

    /// The target did not produce a response head within the deadline.
    #[error("{}: no response from target within {}s", UPSTREAM_PREFIX, .0.as_secs())]
    UpstreamTimeout(Duration),

    /// Anything that does not fit the categories above.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// HTTP status code surfaced to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingTargetUrl => StatusCode::BAD_REQUEST,
            RelayError::InvalidTarget { .. }
            | RelayError::Upstream(_)
            | RelayError::UpstreamTimeout(_)
            | RelayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure came from contacting the target.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidTarget { .. }
                | RelayError::Upstream(_)
                | RelayError::UpstreamTimeout(_)
        )
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an error with its full source chain.
///
/// reqwest keeps the interesting part ("Connection refused", "dns error") in
/// the sources, not in the top-level message.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
