//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health and relay handlers
//! - Wire up middleware (tracing, CORS, timeout, body limit, panic catch-all)
//! - Serve on a listener until the shutdown signal fires

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::error::{RelayError, ServerError};
use crate::http::cors::cors_layer;
use crate::http::request::make_request_span;
use crate::relay::{InboundRequest, Relay};

/// Path of the relay endpoint.
pub const PROXY_PATH: &str = "/proxy";

/// Body of the liveness endpoint.
pub const HEALTH_MESSAGE: &str = "Proxy server is running!";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let relay = Arc::new(Relay::new(config.upstream.clone())?);
        let state = AppState { relay };

        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let routes = Router::new()
            .route("/", get(health_check))
            .route(
                PROXY_PATH,
                get(proxy_handler)
                    .post(proxy_handler)
                    .put(proxy_handler)
                    .delete(proxy_handler),
            )
            .with_state(state);

        apply_layers(routes, config)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Wrap routes in the middleware stack.
///
/// CORS sits outside the timeout and panic layers so their 408 and 500
/// answers stay readable cross-origin.
#[allow(deprecated)]
fn apply_layers(routes: Router, config: &RelayConfig) -> Router {
    routes
        .layer(DefaultBodyLimit::max(config.limits.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.listener.request_timeout_secs,
        )))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
}

/// Liveness probe.
async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}

/// Relay endpoint.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let inbound = InboundRequest::new(method, query.as_deref(), headers, body);

    state.relay.forward(inbound).await.inspect_err(|err| {
        if err.is_upstream() {
            tracing::error!(error = %err, "Proxy request error");
        } else if matches!(err, RelayError::MissingTargetUrl) {
            tracing::debug!("Rejected request without target URL");
        } else {
            tracing::error!(error = %err, "An unexpected error occurred");
        }
    })
}

/// Turn a handler panic into the catch-all 500 instead of dropping the connection.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(detail = %detail, "Handler panicked");
    RelayError::Unexpected(detail).into_response()
}
