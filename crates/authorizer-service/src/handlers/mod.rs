//! HTTP request handlers for the authorizer service.

pub mod authorize;
pub mod health;
pub mod likes;
pub mod metrics;
pub mod rank;

pub use authorize::authorize;
pub use health::health_check;
pub use likes::{decrement_like, increment_like, read_like};
pub use metrics::metrics_handler;
pub use rank::{rank_down, rank_up};
