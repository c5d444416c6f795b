//! Authorization orchestrator.
//!
//! One run per request:
//!
//! ```text
//! Start -> ParseToken -> LookupKey(kid) -> VerifySignature -> ValidateClaims -> Allowed(sub)
//!              |              |                  |                  |
//!              +--------------+------------------+------------------+--> Denied("user")
//! ```
//!
//! Every failure becomes a Deny decision. The caller only ever sees the
//! policy document; which check failed is logged and counted, never returned.

use crate::auth::keys::{KeyLookupError, KeyProvider};
use crate::auth::policy::{synthesize, AuthorizationDecision, Effect};
use crate::auth::request::{AuthorizationRequest, AuthorizerEvent};
use crate::auth::rules::{ClaimViolation, ClaimsValidator, PermissionRules};
use crate::auth::verify::verify;
use crate::observability::metrics;
use common::jwt::{self, ParseError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

/// Cause of a Deny decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DenyReason {
    #[error("Method ARN could not be split into method and path")]
    MalformedRequest,

    #[error("Token could not be parsed: {0:?}")]
    MalformedToken(ParseError),

    #[error("Token key id is not in the key set")]
    UnknownKey,

    #[error("Key provider unavailable: {0}")]
    KeyProviderUnavailable(String),

    #[error("Signature verification failed")]
    SignatureMismatch,

    #[error("Claim check failed: {0}")]
    ClaimViolation(ClaimViolation),
}

impl DenyReason {
    /// True when the denial is not the caller's fault: no key set could be
    /// obtained, so no request can currently be authorized.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, DenyReason::KeyProviderUnavailable(_))
    }

    /// Bounded label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MalformedRequest => "malformed_request",
            DenyReason::MalformedToken(_) => "malformed_token",
            DenyReason::UnknownKey => "unknown_key",
            DenyReason::KeyProviderUnavailable(_) => "key_provider_unavailable",
            DenyReason::SignatureMismatch => "signature_mismatch",
            DenyReason::ClaimViolation(violation) => violation.as_str(),
        }
    }
}

/// Decision plus the reason for a Deny, for callers that must tell a hard
/// failure apart from a permission denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOutcome {
    pub decision: AuthorizationDecision,
    pub deny_reason: Option<DenyReason>,
}

/// Runs the authorization state machine against a shared key provider.
pub struct Authorizer {
    key_provider: Arc<dyn KeyProvider>,
    claims_validator: ClaimsValidator,
}

impl Authorizer {
    /// Create an authorizer.
    ///
    /// # Arguments
    ///
    /// * `key_provider` - Shared signing-key source
    /// * `expected_client_id` - Required `azp` claim value
    /// * `rules` - Resource permission table
    pub fn new(
        key_provider: Arc<dyn KeyProvider>,
        expected_client_id: impl Into<String>,
        rules: PermissionRules,
    ) -> Self {
        Self {
            key_provider,
            claims_validator: ClaimsValidator::new(expected_client_id, rules),
        }
    }

    pub fn key_provider(&self) -> &Arc<dyn KeyProvider> {
        &self.key_provider
    }

    /// Authorize using the wall clock.
    pub async fn authorize(&self, event: &AuthorizerEvent) -> AuthorizationOutcome {
        self.authorize_at(event, chrono::Utc::now().timestamp()).await
    }

    /// Authorize against a fixed `now` (epoch seconds).
    #[instrument(skip_all, name = "authorize")]
    pub async fn authorize_at(&self, event: &AuthorizerEvent, now: i64) -> AuthorizationOutcome {
        let started = Instant::now();
        let result = self.evaluate(event, now).await;

        let outcome = match result {
            Ok(subject) => {
                tracing::info!(target: "authorizer.decision", effect = "Allow", "Request authorized");
                AuthorizationOutcome {
                    decision: synthesize(&event.method_arn, Effect::Allow, Some(&subject)),
                    deny_reason: None,
                }
            }
            Err(reason) => {
                if reason.is_hard_failure() {
                    tracing::error!(
                        target: "authorizer.decision",
                        effect = "Deny",
                        reason = reason.as_str(),
                        error = %reason,
                        "Authorization unavailable"
                    );
                } else {
                    tracing::info!(
                        target: "authorizer.decision",
                        effect = "Deny",
                        reason = reason.as_str(),
                        "Request denied"
                    );
                }
                AuthorizationOutcome {
                    decision: synthesize(&event.method_arn, Effect::Deny, None),
                    deny_reason: Some(reason),
                }
            }
        };

        metrics::record_decision(
            outcome.decision.effect.as_str(),
            outcome.deny_reason.as_ref().map_or("none", DenyReason::as_str),
            started.elapsed(),
        );

        outcome
    }

    /// Run every check; `Ok` carries the verified subject.
    async fn evaluate(&self, event: &AuthorizerEvent, now: i64) -> Result<String, DenyReason> {
        let request =
            AuthorizationRequest::from_event(event).ok_or(DenyReason::MalformedRequest)?;

        let token = jwt::parse(&request.raw_token).map_err(|e| {
            tracing::debug!(target: "authorizer.decision", error = e.as_str(), "Token parse failed");
            DenyReason::MalformedToken(e)
        })?;

        let key = self
            .key_provider
            .get_key(&token.header().kid)
            .await
            .map_err(|e| match e {
                KeyLookupError::NotFound => DenyReason::UnknownKey,
                KeyLookupError::Unavailable(cause) => DenyReason::KeyProviderUnavailable(cause),
            })?;

        if !verify(&token, &key) {
            return Err(DenyReason::SignatureMismatch);
        }

        self.claims_validator
            .validate(token.claims(), &request, now)
            .map_err(DenyReason::ClaimViolation)?;

        Ok(token.into_claims().sub)
    }
}
