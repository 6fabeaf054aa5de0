//! Embedding relay library.
//!
//! A single-endpoint forward proxy: `/proxy?url=<target>` relays the call to
//! the target and streams the answer back with the headers that would block
//! cross-origin framing removed.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use error::{RelayError, ServerError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{InboundRequest, Relay};
