//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay + http layers emit tracing events
//!     → request span (request_id, method, path)
//!     → logging.rs subscriber (pretty or JSON on stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
