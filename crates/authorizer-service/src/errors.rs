//! Authorizer service error types.
//!
//! These errors cover the HTTP surface only. Request-scoped authorization
//! failures never become errors on `/v1/authorize`; they are rendered as a
//! Deny policy document instead. Messages returned to clients are generic;
//! actual causes are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authorizer service error type.
///
/// Maps to HTTP status codes:
/// - Forbidden: 403 Forbidden
/// - BadRequest: 400 Bad Request
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum AuthorizerError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthorizerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorizerError::Forbidden => 403,
            AuthorizerError::BadRequest(_) => 400,
            AuthorizerError::ServiceUnavailable(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthorizerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthorizerError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "User is not authorized to access this resource".to_string(),
            ),
            AuthorizerError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            AuthorizerError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "authorizer.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
