//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (tracing span with request ID)
//!     → cors.rs (preflight, allow-origin)
//!     → relay::Relay (forward to target, stream back)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod server;

pub use request::RequestId;
pub use server::{AppState, HttpServer, HEALTH_MESSAGE, PROXY_PATH};
