//! Like counter handlers.
//!
//! Thin wrappers over the counter store. A store failure answers 500 with
//! `count: 0` and a generic message; the cause is logged.

use crate::models::CounterResponse;
use crate::routes::AppState;
use crate::services::CounterStoreError;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, instrument};

const COUNTER_FAILURE_MESSAGE: &str = "The counter is temporarily unavailable";

/// Handler for GET /v1/like
#[instrument(skip_all, name = "authorizer.handler.read_like")]
pub async fn read_like(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CounterResponse>) {
    counter_response(state.counter_store.read().await)
}

/// Handler for PUT /v1/like
#[instrument(skip_all, name = "authorizer.handler.increment_like")]
pub async fn increment_like(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CounterResponse>) {
    counter_response(state.counter_store.increment(1).await)
}

/// Handler for DELETE /v1/like
#[instrument(skip_all, name = "authorizer.handler.decrement_like")]
pub async fn decrement_like(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CounterResponse>) {
    counter_response(state.counter_store.increment(-1).await)
}

fn counter_response(result: Result<i64, CounterStoreError>) -> (StatusCode, Json<CounterResponse>) {
    match result {
        Ok(count) => (StatusCode::OK, Json(CounterResponse { count, message: None })),
        Err(e) => {
            error!(target: "authorizer.counter", error = %e, "Counter operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CounterResponse {
                    count: 0,
                    message: Some(COUNTER_FAILURE_MESSAGE.to_string()),
                }),
            )
        }
    }
}
