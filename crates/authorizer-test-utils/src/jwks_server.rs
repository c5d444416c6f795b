//! Mock issuer endpoints
//!
//! Mounts the key-discovery document (and optionally the token endpoint) on
//! a `wiremock` server so tests exercise the real HTTP path.

use crate::crypto_fixtures::TestKey;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the issuer publishes its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Path of the issuer's token endpoint.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Build a key-set document containing `keys`.
pub fn jwks_document(keys: &[TestKey]) -> Value {
    json!({ "keys": keys.iter().map(TestKey::jwk_json).collect::<Vec<_>>() })
}

/// Serve `keys` on [`JWKS_PATH`].
///
/// With `expected_calls` set, the server verifies on drop that exactly that
/// many fetches happened.
pub async fn mount_jwks(server: &MockServer, keys: &[TestKey], expected_calls: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)));

    match expected_calls {
        Some(n) => mock.expect(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Serve a client-credentials token on [`TOKEN_PATH`].
pub async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .mount(server)
        .await;
}
