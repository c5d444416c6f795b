//! Member role management through the identity provider's management API.
//!
//! Each operation acquires a fresh client-credentials token and makes one
//! management call. There is no retry; a failure is reported to the caller
//! as-is.
//!
//! # Security
//!
//! - Client secret and management token stay in `SecretString`
//! - Error messages are generic; status codes and causes are logged

use crate::config::RoleManagerConfig;
use async_trait::async_trait;
use common::client_credentials::{acquire_token, ClientCredentialsConfig, TokenError, DEFAULT_HTTP_TIMEOUT};
use common::secret::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Error)]
pub enum RoleManagerError {
    #[error("Management token acquisition failed: {0}")]
    Token(#[from] TokenError),

    #[error("Management API request failed: {0}")]
    Request(String),
}

/// Grant or revoke the member role for a user.
#[async_trait]
pub trait RoleManager: Send + Sync {
    async fn grant(&self, user_id: &str) -> Result<(), RoleManagerError>;

    async fn revoke(&self, user_id: &str) -> Result<(), RoleManagerError>;
}

#[derive(Serialize)]
struct RolesBody<'a> {
    roles: [&'a str; 1],
}

/// Role manager backed by the issuer's management API.
pub struct Auth0RoleManager {
    http_client: reqwest::Client,
    credentials: ClientCredentialsConfig,
    api_base_url: String,
    role_id: String,
}

impl Auth0RoleManager {
    /// Create a role manager for `issuer_url` (scheme included, no trailing
    /// slash).
    pub fn new(issuer_url: &str, config: &RoleManagerConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authorizer.roles", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        let api_base_url = format!("{issuer_url}/api/v2");
        let credentials = ClientCredentialsConfig::new(
            format!("{issuer_url}/oauth/token"),
            config.client_id.clone(),
            config.client_secret.clone(),
            format!("{api_base_url}/"),
        );

        Self {
            http_client,
            credentials,
            api_base_url,
            role_id: config.role_id.clone(),
        }
    }

    /// One roles call: `POST` grants, `DELETE` revokes.
    async fn change_roles(&self, method: reqwest::Method, user_id: &str) -> Result<(), RoleManagerError> {
        let token = acquire_token(&self.http_client, &self.credentials).await?;

        // The id arrives percent-encoded from the request path
        let url = format!("{}/users/{user_id}/roles", self.api_base_url);

        let response = self
            .http_client
            .request(method, &url)
            .bearer_auth(token.expose_secret())
            .json(&RolesBody { roles: [self.role_id.as_str()] })
            .send()
            .await
            .map_err(|e| {
                error!(target: "authorizer.roles", error = %e, "Management API request failed");
                RoleManagerError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            error!(
                target: "authorizer.roles",
                status = %response.status(),
                "Management API returned error"
            );
            return Err(RoleManagerError::Request(format!(
                "Unexpected status: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RoleManager for Auth0RoleManager {
    #[instrument(skip_all)]
    async fn grant(&self, user_id: &str) -> Result<(), RoleManagerError> {
        self.change_roles(reqwest::Method::POST, user_id).await?;
        info!(target: "authorizer.roles", "Member role granted");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn revoke(&self, user_id: &str) -> Result<(), RoleManagerError> {
        self.change_roles(reqwest::Method::DELETE, user_id).await?;
        info!(target: "authorizer.roles", "Member role revoked");
        Ok(())
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Role manager that records calls.
    #[derive(Default)]
    pub struct MockRoleManager {
        calls: Mutex<Vec<(&'static str, String)>>,
        failing: bool,
    }

    impl MockRoleManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        /// Recorded `(operation, user_id)` pairs in call order.
        pub fn calls(&self) -> Vec<(&'static str, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn record(&self, operation: &'static str, user_id: &str) -> Result<(), RoleManagerError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((operation, user_id.to_string()));
            }
            if self.failing {
                return Err(RoleManagerError::Request("mock failure".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RoleManager for MockRoleManager {
        async fn grant(&self, user_id: &str) -> Result<(), RoleManagerError> {
            self.record("grant", user_id)
        }

        async fn revoke(&self, user_id: &str) -> Result<(), RoleManagerError> {
            self.record("revoke", user_id)
        }
    }
}
