//! Metrics definitions for the authorizer service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authorizer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `effect`: 2 values (Allow, Deny)
//! - `reason`: bounded by `DenyReason` labels plus `none`
//! - `status`: 2 values for JWKS fetches (success, error)
//! - `method`: HTTP methods served
//! - `endpoint`: normalized route templates, unknown paths become `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization decisions are in-process after the first fetch
        .set_buckets_for_metric(
            Matcher::Full("authorizer_decision_duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set decision buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record one authorization decision
///
/// Metric: `authorizer_decisions_total`, `authorizer_decision_duration_seconds`
/// Labels: `effect`, `reason`
pub fn record_decision(effect: &str, reason: &str, duration: Duration) {
    histogram!("authorizer_decision_duration_seconds",
        "effect" => effect.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_decisions_total",
        "effect" => effect.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a key-set fetch attempt
///
/// Metric: `authorizer_jwks_fetch_total`, `authorizer_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("authorizer_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("authorizer_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authorizer_http_requests_total`, `authorizer_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);

    histogram!("authorizer_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces user ids with a placeholder.
pub fn normalize_endpoint(path: &str) -> String {
    match path {
        "/v1/authorize" | "/v1/health" | "/v1/like" | "/metrics" => path.to_string(),
        _ => match path.strip_prefix("/v1/rank/") {
            Some(id) if !id.is_empty() && !id.contains('/') => "/v1/rank/{id}".to_string(),
            _ => "/other".to_string(),
        },
    }
}
