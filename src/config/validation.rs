//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All problems are reported at once rather than stopping at the first.

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::RelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_REDIRECTS_CEILING: usize = 100;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("upstream.max_redirects must be at most {}, got {}", MAX_REDIRECTS_CEILING, .0)]
    TooManyRedirects(usize),

    #[error(
        "listener.request_timeout_secs ({request}) must exceed upstream.timeout_secs ({upstream})"
    )]
    TimeoutOrder { request: u64, upstream: u64 },

    #[error("cors.allowed_origins contains an invalid origin: {0:?}")]
    InvalidOrigin(String),

    #[error("observability.log_level must be one of trace, debug, info, warn, error; got {0:?}")]
    InvalidLogLevel(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.request_timeout_secs" });
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.timeout_secs" });
    }
    // Otherwise the listener answers 408 before the upstream deadline can produce its 500.
    let (request, upstream) = (config.listener.request_timeout_secs, config.upstream.timeout_secs);
    if request > 0 && upstream > 0 && request <= upstream {
        errors.push(ValidationError::TimeoutOrder { request, upstream });
    }
    if config.upstream.chunk_size == 0 {
        errors.push(ValidationError::Zero { field: "upstream.chunk_size" });
    }
    if config.upstream.stall_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero { field: "upstream.stall_timeout_secs" });
    }
    if config.upstream.max_redirects > MAX_REDIRECTS_CEILING {
        errors.push(ValidationError::TooManyRedirects(config.upstream.max_redirects));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "limits.max_body_size" });
    }

    for origin in &config.cors.allowed_origins {
        // "*" is expressed by leaving the list empty.
        if origin == "*" || HeaderValue::from_str(origin).is_err() || url::Url::parse(origin).is_err() {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
