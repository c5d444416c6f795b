//! Claims validation and the resource permission table.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. `azp` equals the expected client id
//! 2. `exp` is strictly greater than now
//! 3. Every permission rule matching the request is satisfied
//!
//! Rules are data, not control flow. Adding a protected resource means adding
//! a [`PermissionRule`] to the table.

use crate::auth::request::AuthorizationRequest;
use common::jwt::Claims;
use thiserror::Error;

/// Reason a verified token's claims do not authorize the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimViolation {
    #[error("Token was issued to a different client")]
    WrongAuthorizedParty,

    #[error("Token is expired")]
    Expired,

    #[error("Missing required permission: {0}")]
    MissingPermission(String),
}

impl ClaimViolation {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimViolation::WrongAuthorizedParty => "wrong_authorized_party",
            ClaimViolation::Expired => "expired",
            ClaimViolation::MissingPermission(_) => "missing_permission",
        }
    }
}

/// One `{method, path prefix} -> permission` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    pub method: String,
    pub path_prefix: String,
    pub required_permission: String,
}

impl PermissionRule {
    pub fn new(
        method: impl Into<String>,
        path_prefix: impl Into<String>,
        required_permission: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path_prefix: path_prefix.into(),
            required_permission: required_permission.into(),
        }
    }

    /// True when the method is equal and the path starts with the prefix's
    /// segments. `like` matches `like` and `like/7` but not `likes`.
    pub fn matches(&self, method: &str, path: &str) -> bool {
        if self.method != method {
            return false;
        }

        let mut path_segments = segments(path);
        segments(&self.path_prefix).all(|prefix| path_segments.next() == Some(prefix))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Ordered permission table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRules {
    rules: Vec<PermissionRule>,
}

impl Default for PermissionRules {
    /// Deleting a like requires `delete:like`.
    fn default() -> Self {
        Self::new(vec![PermissionRule::new("DELETE", "like", "delete:like")])
    }
}

impl PermissionRules {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }

    /// Permissions required for a method and path, in table order.
    pub fn required_for<'a>(
        &'a self,
        method: &'a str,
        path: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(method, path))
            .map(|rule| rule.required_permission.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Validates claims for one expected client against a rule table.
#[derive(Debug, Clone)]
pub struct ClaimsValidator {
    expected_client_id: String,
    rules: PermissionRules,
}

impl ClaimsValidator {
    pub fn new(expected_client_id: impl Into<String>, rules: PermissionRules) -> Self {
        Self {
            expected_client_id: expected_client_id.into(),
            rules,
        }
    }

    /// Check the claims of a verified token against the request.
    ///
    /// # Errors
    ///
    /// The first failed check, as a [`ClaimViolation`].
    pub fn validate(
        &self,
        claims: &Claims,
        request: &AuthorizationRequest,
        now_epoch_seconds: i64,
    ) -> Result<(), ClaimViolation> {
        if claims.azp != self.expected_client_id {
            tracing::debug!(target: "authorizer.claims", "Authorized party mismatch");
            return Err(ClaimViolation::WrongAuthorizedParty);
        }

        if claims.exp <= now_epoch_seconds {
            tracing::debug!(
                target: "authorizer.claims",
                exp = claims.exp,
                now = now_epoch_seconds,
                "Token expired"
            );
            return Err(ClaimViolation::Expired);
        }

        for required in self
            .rules
            .required_for(&request.http_method, &request.resource_path)
        {
            if !claims.has_permission(required) {
                tracing::debug!(
                    target: "authorizer.claims",
                    required = %required,
                    method = %request.http_method,
                    "Required permission missing"
                );
                return Err(ClaimViolation::MissingPermission(required.to_string()));
            }
        }

        Ok(())
    }
}
