//! Route guard backed by the authorizer.
//!
//! Turns an HTTP request into the same invocation the gateway would send:
//! the `Authorization` header becomes the token and a method ARN is built as
//! `{API_ARN_PREFIX}/{METHOD}/{path without /v1/}`. The request continues
//! only on Allow.

use crate::auth::AuthorizerEvent;
use crate::errors::AuthorizerError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Verified subject of an allowed request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPrincipal(pub String);

/// Authorize the request or reject it.
///
/// # Response
///
/// - 403 Forbidden on any Deny caused by the token or its claims
/// - 503 Service Unavailable when no key set is available
#[instrument(skip_all, name = "authorizer.middleware.authorize")]
pub async fn require_authorization(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthorizerError> {
    // Missing or non-ASCII header is an empty token, which parses as missing
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let method_arn = method_arn(
        &state.config.api_arn_prefix,
        req.method().as_str(),
        req.uri().path(),
    );

    let outcome = state
        .authorizer
        .authorize(&AuthorizerEvent::new(token, method_arn))
        .await;

    if let Some(reason) = outcome.deny_reason {
        return Err(if reason.is_hard_failure() {
            AuthorizerError::ServiceUnavailable(reason.to_string())
        } else {
            AuthorizerError::Forbidden
        });
    }

    req.extensions_mut()
        .insert(AuthorizedPrincipal(outcome.decision.principal));

    Ok(next.run(req).await)
}

/// Build the method ARN for an HTTP request.
pub fn method_arn(prefix: &str, method: &str, path: &str) -> String {
    let resource = path
        .strip_prefix("/v1/")
        .unwrap_or_else(|| path.trim_start_matches('/'));
    format!("{prefix}/{method}/{resource}")
}
