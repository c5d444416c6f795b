//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /v1/health
///
/// Reports "healthy" once at least one signing key is cached. Always 200 so
/// probes can read the body.
#[instrument(skip_all, name = "authorizer.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let key_count = state.authorizer.key_provider().key_count().await;

    let status = if key_count > 0 { "healthy" } else { "unhealthy" };

    Json(HealthResponse {
        status: status.to_string(),
        key_count,
    })
}
