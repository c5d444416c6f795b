//! Authorizer service models.
//!
//! Response bodies of the HTTP surface. The authorizer's own invocation
//! types live in `auth::request` and `auth::policy`.

use serde::{Deserialize, Serialize};

/// Health check response.
///
/// Returned by the `/v1/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when at least one signing key is cached, "unhealthy" otherwise.
    pub status: String,

    /// Number of cached signing keys.
    pub key_count: usize,
}

/// Counter read or update result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResponse {
    pub count: i64,

    /// Generic failure description; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Plain message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
