//! Policy synthesis.
//!
//! Pure and deterministic. A decision always carries exactly one statement
//! for the exact resource ARN it was asked about.

use serde::{Deserialize, Serialize};

/// Principal used when no verified subject is available.
pub const DEFAULT_PRINCIPAL: &str = "user";

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The single action a statement covers.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Terminal output of one authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub principal: String,
    pub effect: Effect,
    pub resource_arn: String,
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Render the invocation response document.
    pub fn to_response(&self) -> AuthorizerResponse {
        AuthorizerResponse {
            principal_id: self.principal.clone(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![Statement {
                    action: INVOKE_ACTION.to_string(),
                    effect: self.effect,
                    resource: self.resource_arn.clone(),
                }],
            },
        }
    }
}

/// Build a decision for `resource_arn`.
///
/// `principal` falls back to [`DEFAULT_PRINCIPAL`] when `None`.
pub fn synthesize(resource_arn: &str, effect: Effect, principal: Option<&str>) -> AuthorizationDecision {
    AuthorizationDecision {
        principal: principal.unwrap_or(DEFAULT_PRINCIPAL).to_string(),
        effect,
        resource_arn: resource_arn.to_string(),
    }
}

/// Invocation response. Field order is fixed by declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}
