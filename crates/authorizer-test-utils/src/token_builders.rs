//! Builder patterns for test token construction
//!
//! Provides fluent APIs for creating signed test tokens and for damaging
//! them in controlled ways.

use crate::crypto_fixtures::TestKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Default `azp` for test tokens.
pub const TEST_CLIENT_ID: &str = "test-client-id";

/// Default `sub` for test tokens.
pub const TEST_SUBJECT: &str = "auth0|test-user";

/// Builder for issuer-shaped access token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .sub("auth0|alice")
///     .permissions(&["delete:like"])
///     .sign_with(&TestKey::new(TestKeyId::K1));
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    sub: String,
    azp: String,
    exp: i64,
    permissions: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Create a builder with defaults: test subject and client, expiring in an hour
    pub fn new() -> Self {
        Self {
            sub: TEST_SUBJECT.to_string(),
            azp: TEST_CLIENT_ID.to_string(),
            exp: (Utc::now() + Duration::seconds(3600)).timestamp(),
            permissions: None,
        }
    }

    pub fn sub(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    pub fn azp(mut self, azp: &str) -> Self {
        self.azp = azp.to_string();
        self
    }

    /// Set an absolute expiry (epoch seconds)
    pub fn exp(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| (*p).to_string()).collect());
        self
    }

    /// Build the claims as a JSON value
    ///
    /// `permissions` is omitted entirely unless set.
    pub fn build(&self) -> Value {
        let mut claims = json!({
            "iss": "https://tenant.example.com/",
            "sub": self.sub,
            "aud": ["https://api.example.com"],
            "azp": self.azp,
            "exp": self.exp,
            "iat": self.exp - 3600,
        });
        if let (Some(permissions), Some(object)) = (&self.permissions, claims.as_object_mut()) {
            object.insert("permissions".to_string(), json!(permissions));
        }
        claims
    }

    /// Sign with `key`, using its own `kid`
    pub fn sign_with(&self, key: &TestKey) -> String {
        key.sign(&self.build())
    }

    /// Sign with `key` but advertise a different `kid`
    pub fn sign_with_kid(&self, key: &TestKey, kid: &str) -> String {
        key.sign_with_kid(&self.build(), kid)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip one bit in the signature, keeping it valid base64url
pub fn tamper_signature(token: &str) -> String {
    let (signing_input, signature) = token.rsplit_once('.').expect("token has a signature segment");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature is base64url");
    if let Some(first) = bytes.first_mut() {
        *first ^= 0x01;
    }
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Replace the header segment, keeping payload and signature
pub fn replace_header(token: &str, header: &Value) -> String {
    let (_, rest) = token.split_once('.').expect("token has a header segment");
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).expect("header serializes"));
    format!("{encoded}.{rest}")
}

/// Encode an unsigned token from raw header and payload JSON
pub fn unsigned_token(header: &Value, payload: &Value) -> String {
    let encode = |v: &Value| URL_SAFE_NO_PAD.encode(serde_json::to_vec(v).expect("value serializes"));
    format!("{}.{}.{}", encode(header), encode(payload), URL_SAFE_NO_PAD.encode(b"sig"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::TestKeyId;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new().build();

        assert_eq!(claims["sub"], TEST_SUBJECT);
        assert_eq!(claims["azp"], TEST_CLIENT_ID);
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
        assert!(claims.get("permissions").is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let claims = TestTokenBuilder::new()
            .sub("u1")
            .azp("app1")
            .exp(9_999_999_999)
            .permissions(&["delete:like"])
            .build();

        assert_eq!(claims["sub"], "u1");
        assert_eq!(claims["azp"], "app1");
        assert_eq!(claims["exp"], 9_999_999_999_i64);
        assert_eq!(claims["permissions"], json!(["delete:like"]));
    }

    #[test]
    fn test_tamper_changes_only_signature() {
        let token = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let tampered = tamper_signature(&token);

        assert_ne!(token, tampered);
        assert_eq!(
            token.rsplit_once('.').unwrap().0,
            tampered.rsplit_once('.').unwrap().0
        );
    }

    #[test]
    fn test_replace_header_keeps_payload() {
        let token = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let replaced = replace_header(&token, &json!({ "alg": "none", "kid": "k1" }));

        assert_eq!(
            token.split_once('.').unwrap().1,
            replaced.split_once('.').unwrap().1
        );
    }
}
