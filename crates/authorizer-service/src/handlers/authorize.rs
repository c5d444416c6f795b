//! Token authorizer endpoint.

use crate::auth::{AuthorizerEvent, AuthorizerResponse};
use crate::routes::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /v1/authorize
///
/// Always answers 200 with a policy document; Deny is a policy, not an HTTP
/// error.
///
/// ## Example Response
///
/// ```json
/// {
///   "principalId": "auth0|u1",
///   "policyDocument": {
///     "Version": "2012-10-17",
///     "Statement": [
///       { "Action": "execute-api:Invoke", "Effect": "Allow", "Resource": "arn:...:abc/prod/GET/like" }
///     ]
///   }
/// }
/// ```
#[instrument(skip_all, name = "authorizer.handler.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AuthorizerEvent>,
) -> Json<AuthorizerResponse> {
    let outcome = state.authorizer.authorize(&event).await;
    Json(outcome.decision.to_response())
}
