//! Member rank handlers.
//!
//! The user id is taken from the raw request path so it reaches the
//! management API exactly as the caller encoded it.

use crate::errors::AuthorizerError;
use crate::models::MessageResponse;
use crate::routes::AppState;
use crate::services::{RoleManager, RoleManagerError};
use axum::{extract::State, http::StatusCode, http::Uri, Json};
use std::sync::Arc;
use tracing::{error, instrument};

const RANK_PATH_PREFIX: &str = "/v1/rank/";
const RANK_FAILURE_MESSAGE: &str = "The member role could not be updated";
const RANKED_UP_MESSAGE: &str = "Ranked Up.";
const RANKED_DOWN_MESSAGE: &str = "Ranked Down.";

/// Handler for PUT /v1/rank/:id
#[instrument(skip_all, name = "authorizer.handler.rank_up")]
pub async fn rank_up(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<(StatusCode, Json<MessageResponse>), AuthorizerError> {
    let (role_manager, user_id) = prepare(&state, &uri)?;
    Ok(rank_response(role_manager.grant(user_id).await, RANKED_UP_MESSAGE))
}

/// Handler for DELETE /v1/rank/:id
#[instrument(skip_all, name = "authorizer.handler.rank_down")]
pub async fn rank_down(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<(StatusCode, Json<MessageResponse>), AuthorizerError> {
    let (role_manager, user_id) = prepare(&state, &uri)?;
    Ok(rank_response(role_manager.revoke(user_id).await, RANKED_DOWN_MESSAGE))
}

fn prepare<'a>(
    state: &'a AppState,
    uri: &'a Uri,
) -> Result<(&'a Arc<dyn RoleManager>, &'a str), AuthorizerError> {
    let role_manager = state.role_manager.as_ref().ok_or_else(|| {
        AuthorizerError::ServiceUnavailable("role manager is not configured".to_string())
    })?;

    let user_id = raw_user_id(uri.path())
        .ok_or_else(|| AuthorizerError::BadRequest("Missing user id".to_string()))?;

    Ok((role_manager, user_id))
}

/// Percent-encoded user id segment of `/v1/rank/{id}`.
fn raw_user_id(path: &str) -> Option<&str> {
    path.strip_prefix(RANK_PATH_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

fn rank_response(
    result: Result<(), RoleManagerError>,
    success_message: &str,
) -> (StatusCode, Json<MessageResponse>) {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: success_message.to_string(),
            }),
        ),
        Err(e) => {
            error!(target: "authorizer.roles", error = %e, "Role update failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: RANK_FAILURE_MESSAGE.to_string(),
                }),
            )
        }
    }
}
