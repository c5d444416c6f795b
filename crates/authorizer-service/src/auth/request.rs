//! Authorizer invocation input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token-authorizer invocation payload.
///
/// Same shape the API gateway sends to a token authorizer; `type` is
/// accepted and ignored.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    /// Raw `Authorization` header value, optionally prefixed with `Bearer `.
    #[serde(default)]
    pub authorization_token: String,

    /// ARN of the method being invoked; echoed verbatim in the policy.
    pub method_arn: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl fmt::Debug for AuthorizerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizerEvent")
            .field("authorization_token", &"[REDACTED]")
            .field("method_arn", &self.method_arn)
            .field("event_type", &self.event_type)
            .finish()
    }
}

impl AuthorizerEvent {
    /// Build an event from a bearer header value and a method ARN.
    pub fn new(authorization_token: impl Into<String>, method_arn: impl Into<String>) -> Self {
        Self {
            authorization_token: authorization_token.into(),
            method_arn: method_arn.into(),
            event_type: Some("TOKEN".to_string()),
        }
    }
}

/// One authorization request, derived from an [`AuthorizerEvent`].
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub resource_arn: String,
    pub http_method: String,
    pub resource_path: String,
    pub raw_token: String,
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("resource_arn", &self.resource_arn)
            .field("http_method", &self.http_method)
            .field("resource_path", &self.resource_path)
            .field("raw_token", &"[REDACTED]")
            .finish()
    }
}

impl AuthorizationRequest {
    /// Split the method ARN into method and path.
    ///
    /// The ARN's resource part is `{api}/{stage}/{METHOD}/{path...}`, so the
    /// method is the third slash-delimited segment and the path is whatever
    /// follows it. Returns `None` when fewer than three segments exist or
    /// the method segment is empty.
    pub fn from_event(event: &AuthorizerEvent) -> Option<Self> {
        let (http_method, resource_path) = split_method_arn(&event.method_arn)?;

        Some(Self {
            resource_arn: event.method_arn.clone(),
            http_method: http_method.to_string(),
            resource_path: resource_path.to_string(),
            raw_token: event.authorization_token.clone(),
        })
    }
}

fn split_method_arn(method_arn: &str) -> Option<(&str, &str)> {
    let mut segments = method_arn.splitn(4, '/');
    let _api = segments.next()?;
    let _stage = segments.next()?;
    let method = segments.next().filter(|m| !m.is_empty())?;
    let path = segments.next().unwrap_or("");
    Some((method, path))
}
