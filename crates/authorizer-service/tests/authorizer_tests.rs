//! Authorizer integration tests.
//!
//! End-to-end decisions over signed RS256 tokens, against both a preloaded
//! key provider and a mocked key-discovery endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use authorizer_service::auth::{
    AuthorizerEvent, AuthorizerResponse, ClaimViolation, DenyReason, Effect, JwksKeyProvider,
    KeyProvider,
};
use authorizer_test_utils::{
    mount_jwks, published_keys, unsigned_token, TestKey, TestKeyId, TestTokenBuilder, JWKS_PATH,
};
use common::{authorizer_with, static_provider, ARN_PREFIX, CLIENT_ID};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn arn(method_and_path: &str) -> String {
    format!("{ARN_PREFIX}/{method_and_path}")
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn k1() -> TestKey {
    TestKey::new(TestKeyId::K1)
}

fn valid_token() -> TestTokenBuilder {
    TestTokenBuilder::new().sub("u1").azp(CLIENT_ID).exp(9_999_999_999)
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[tokio::test]
async fn scenario_a_valid_token_is_allowed() {
    let authorizer = authorizer_with(static_provider());
    let event = AuthorizerEvent::new(bearer(&valid_token().sign_with(&k1())), arn("GET/items/42"));

    let outcome = authorizer.authorize(&event).await;

    assert_eq!(outcome.decision.effect, Effect::Allow);
    assert_eq!(outcome.decision.principal, "u1");
    assert_eq!(outcome.decision.resource_arn, arn("GET/items/42"));
}

#[tokio::test]
async fn scenario_b_expired_token_is_denied() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().exp(1).sign_with(&k1());
    let event = AuthorizerEvent::new(bearer(&token), arn("GET/items/42"));

    let outcome = authorizer.authorize(&event).await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.decision.principal, "user");
    assert_eq!(
        outcome.deny_reason,
        Some(DenyReason::ClaimViolation(ClaimViolation::Expired))
    );
}

#[tokio::test]
async fn scenario_c_other_client_is_denied() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().azp("other-app").sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("GET/items/42")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(
        outcome.deny_reason,
        Some(DenyReason::ClaimViolation(ClaimViolation::WrongAuthorizedParty))
    );
}

#[tokio::test]
async fn scenario_d_delete_like_without_permissions_is_denied() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("DELETE/like/7")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(
        outcome.deny_reason,
        Some(DenyReason::ClaimViolation(ClaimViolation::MissingPermission(
            "delete:like".to_string()
        )))
    );
}

#[tokio::test]
async fn scenario_e_delete_like_with_permission_is_allowed() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().permissions(&["delete:like"]).sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("DELETE/like/7")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Allow);
    assert_eq!(outcome.decision.principal, "u1");
}

#[tokio::test]
async fn scenario_f_unparseable_token_is_denied() {
    let authorizer = authorizer_with(static_provider());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new("Bearer not.a.validb64", arn("GET/like")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.decision.principal, "user");
    assert!(matches!(outcome.deny_reason, Some(DenyReason::MalformedToken(_))));
}

// ============================================================================
// General properties
// ============================================================================

#[tokio::test]
async fn test_resource_arn_is_echoed_verbatim() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().sign_with(&k1());

    for method_and_path in ["GET/items/42", "PUT/Like/", "DELETE/like/7/extra", "POST"] {
        let method_arn = arn(method_and_path);
        let outcome = authorizer
            .authorize(&AuthorizerEvent::new(bearer(&token), method_arn.clone()))
            .await;

        let response = outcome.decision.to_response();
        assert_eq!(response.policy_document.statement.len(), 1);
        assert_eq!(
            response.policy_document.statement.first().unwrap().resource,
            method_arn
        );
    }
}

#[tokio::test]
async fn test_forged_token_with_valid_claims_is_denied() {
    let authorizer = authorizer_with(static_provider());
    let forged = valid_token().sign_with_kid(&TestKey::new(TestKeyId::Rogue), "k1");

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&forged), arn("GET/like")))
        .await;

    assert_eq!(outcome.deny_reason, Some(DenyReason::SignatureMismatch));
}

#[tokio::test]
async fn test_unsigned_token_is_denied() {
    let authorizer = authorizer_with(static_provider());
    let token = unsigned_token(
        &serde_json::json!({ "alg": "none", "kid": "k1" }),
        &valid_token().build(),
    );

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("GET/like")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
}

#[tokio::test]
async fn test_token_without_bearer_prefix_is_accepted() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(token, arn("GET/like")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Allow);
}

#[tokio::test]
async fn test_response_serializes_to_gateway_shape() {
    let authorizer = authorizer_with(static_provider());
    let token = valid_token().sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("GET/like")))
        .await;
    let json = serde_json::to_value(outcome.decision.to_response()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "principalId": "u1",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "execute-api:Invoke",
                    "Effect": "Allow",
                    "Resource": arn("GET/like")
                }]
            }
        })
    );

    let parsed: AuthorizerResponse = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.principal_id, "u1");
}

// ============================================================================
// Key-discovery endpoint
// ============================================================================

fn jwks_provider(server: &MockServer, cooldown: Duration) -> Arc<JwksKeyProvider> {
    Arc::new(JwksKeyProvider::new(
        format!("{}{JWKS_PATH}", server.uri()),
        Duration::from_secs(2),
        cooldown,
    ))
}

#[tokio::test]
async fn test_keys_fetched_once_for_many_requests() {
    let server = MockServer::start().await;
    mount_jwks(&server, &published_keys(), Some(1)).await;

    let provider = jwks_provider(&server, Duration::from_secs(300));
    let authorizer = Arc::new(authorizer_with(provider.clone()));
    let token = valid_token().sign_with(&k1());

    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let authorizer = Arc::clone(&authorizer);
            let event = AuthorizerEvent::new(bearer(&token), arn("GET/like"));
            tokio::spawn(async move { authorizer.authorize(&event).await })
        })
        .collect();

    for outcome in futures::future::join_all(tasks).await {
        assert_eq!(outcome.unwrap().decision.effect, Effect::Allow);
    }
    assert_eq!(provider.key_count().await, 2);
}

#[tokio::test]
async fn test_rotated_key_picked_up_after_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(authorizer_test_utils::jwks_document(&[k1()])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_jwks(&server, &published_keys(), None).await;

    let provider = jwks_provider(&server, Duration::from_millis(100));
    provider.warm_up().await.unwrap();
    let authorizer = authorizer_with(provider);

    let rotated = valid_token().sign_with(&TestKey::new(TestKeyId::K2));
    let event = AuthorizerEvent::new(bearer(&rotated), arn("GET/like"));

    // Inside the cooldown the new key id is simply unknown
    let outcome = authorizer.authorize(&event).await;
    assert_eq!(outcome.deny_reason, Some(DenyReason::UnknownKey));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let outcome = authorizer.authorize(&event).await;
    assert_eq!(outcome.decision.effect, Effect::Allow);
}

#[tokio::test]
async fn test_unreachable_issuer_is_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let authorizer = authorizer_with(jwks_provider(&server, Duration::from_secs(300)));
    let token = valid_token().sign_with(&k1());

    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("GET/like")))
        .await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.decision.principal, "user");
    let reason = outcome.deny_reason.unwrap();
    assert!(reason.is_hard_failure());
    assert!(matches!(reason, DenyReason::KeyProviderUnavailable(_)));
}

#[tokio::test]
async fn test_key_set_without_usable_keys_is_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "keys": [{ "kty": "RSA", "use": "enc", "kid": "k1", "x5c": [k1().x5c()] }]
        })))
        .mount(&server)
        .await;

    let provider = jwks_provider(&server, Duration::from_secs(300));
    assert!(provider.warm_up().await.is_err());

    let authorizer = authorizer_with(provider);
    let token = valid_token().sign_with(&k1());
    let outcome = authorizer
        .authorize(&AuthorizerEvent::new(bearer(&token), arn("GET/like")))
        .await;

    assert!(outcome.deny_reason.unwrap().is_hard_failure());
}
