//! Middleware for the authorizer service.
//!
//! # Components
//!
//! - `authorize` - Guard for the protected routes
//! - `http_metrics` - HTTP request metrics

pub mod authorize;
pub mod http_metrics;

pub use authorize::{require_authorization, AuthorizedPrincipal};
pub use http_metrics::http_metrics_middleware;
