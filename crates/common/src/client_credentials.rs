//! OAuth 2.0 client-credentials token acquisition.
//!
//! Obtains a service-to-service access token from the issuer's token
//! endpoint. Used for management API calls that act on behalf of the
//! service rather than an end user.
//!
//! Tokens are acquired per operation; no background refresh is performed.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::client_credentials::{acquire_token, ClientCredentialsConfig};
//! use common::secret::SecretString;
//!
//! let config = ClientCredentialsConfig::new(
//!     "https://tenant.example.com/oauth/token".to_string(),
//!     "m2m-client".to_string(),
//!     SecretString::from("secret"),
//!     "https://tenant.example.com/api/v2/".to_string(),
//! );
//! let token = acquire_token(&http_client, &config).await?;
//! ```
//!
//! # Security
//!
//! - Client secret and access token are held as `SecretString`
//! - Error response bodies are logged at trace level only

use crate::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

/// Default HTTP request timeout for token requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during token acquisition.
#[derive(Error, Debug, Clone)]
pub enum TokenError {
    /// HTTP transport failure or unexpected status.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// Credentials rejected by the issuer (400, 401, 403).
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// Token response could not be parsed.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Client-credentials grant parameters.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    /// Full token endpoint URL (e.g. `https://tenant/oauth/token`).
    pub token_url: String,

    /// Machine-to-machine client identifier.
    pub client_id: String,

    /// Machine-to-machine client secret.
    pub client_secret: SecretString,

    /// API audience the token is requested for.
    pub audience: String,
}

impl fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("audience", &self.audience)
            .finish()
    }
}

impl ClientCredentialsConfig {
    /// Create a new grant configuration.
    #[must_use]
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: SecretString,
        audience: String,
    ) -> Self {
        Self {
            token_url,
            client_id,
            client_secret,
            audience,
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: SecretString,
    #[allow(dead_code)]
    #[serde(default)]
    token_type: Option<String>,
}

/// Acquire an access token via the client-credentials grant.
///
/// # Errors
///
/// - `TokenError::HttpError` - transport failure or unexpected status
/// - `TokenError::AuthenticationRejected` - issuer rejected the credentials
/// - `TokenError::InvalidResponse` - response body is not a token response
#[instrument(skip_all, fields(client_id = %config.client_id))]
pub async fn acquire_token(
    http_client: &reqwest::Client,
    config: &ClientCredentialsConfig,
) -> Result<SecretString, TokenError> {
    debug!(
        target: "common.client_credentials",
        url = %config.token_url,
        "Requesting client-credentials token"
    );

    let body = TokenRequest {
        client_id: &config.client_id,
        client_secret: config.client_secret.expose_secret(),
        audience: &config.audience,
        grant_type: "client_credentials",
    };

    let response = http_client
        .post(&config.token_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            debug!(target: "common.client_credentials", error = %e, "HTTP request failed");
            TokenError::HttpError(e.to_string())
        })?;

    let status = response.status();

    if status.is_success() {
        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!(target: "common.client_credentials", error = %e, "Failed to parse token response");
            TokenError::InvalidResponse(e.to_string())
        })?;

        debug!(target: "common.client_credentials", "Token acquired successfully");
        return Ok(token.access_token);
    }

    if matches!(status.as_u16(), 400 | 401 | 403) {
        let body = response.text().await.unwrap_or_else(|e| {
            trace!(target: "common.client_credentials", error = %e, "Failed to read error body");
            "<failed to read body>".to_string()
        });
        warn!(
            target: "common.client_credentials",
            status = %status,
            "Client credentials rejected by issuer"
        );
        trace!(target: "common.client_credentials", body = %body, "Rejection response body");
        return Err(TokenError::AuthenticationRejected(format!("Status {status}")));
    }

    warn!(
        target: "common.client_credentials",
        status = %status,
        "Unexpected response from token endpoint"
    );
    Err(TokenError::HttpError(format!("Unexpected status: {status}")))
}
