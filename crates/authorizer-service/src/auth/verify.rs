//! Token signature verification.
//!
//! Only RS256 (RSA PKCS#1 v1.5 with SHA-256) is accepted. The algorithm is
//! checked against the header before any cryptographic work so a token
//! cannot pick a weaker scheme.

use crate::auth::keys::SigningKey;
use common::jwt::Token;

/// The only accepted signing algorithm.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Verify the token's signature with the key named by its `kid`.
///
/// Returns `true` only when the header algorithm is RS256, the key id
/// matches and the signature is valid over `header.payload` exactly as
/// received.
pub fn verify(token: &Token, key: &SigningKey) -> bool {
    let header = token.header();

    if header.alg != SUPPORTED_ALGORITHM {
        tracing::debug!(
            target: "authorizer.verify",
            alg = %header.alg,
            "Token uses unsupported algorithm"
        );
        return false;
    }

    if header.kid != key.key_id() {
        tracing::debug!(target: "authorizer.verify", "Key id does not match token header");
        return false;
    }

    let valid = key
        .public_key()
        .verify(token.signing_input().as_bytes(), token.signature());

    if !valid {
        tracing::debug!(target: "authorizer.verify", kid = %header.kid, "Signature verification failed");
    }

    valid
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use authorizer_test_utils::{replace_header, tamper_signature, TestKey, TestKeyId, TestTokenBuilder};
    use common::jwt::parse;

    fn signing_key(id: TestKeyId) -> SigningKey {
        let test_key = TestKey::new(id);
        SigningKey::from_x5c(test_key.kid(), test_key.x5c()).unwrap()
    }

    #[test]
    fn test_valid_signature_verifies() {
        let raw = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let token = parse(&raw).unwrap();

        assert!(verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        // Rogue key signs but claims kid "k1"
        let raw = TestTokenBuilder::new()
            .sign_with_kid(&TestKey::new(TestKeyId::Rogue), "k1");
        let token = parse(&raw).unwrap();

        assert!(!verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let raw = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let token = parse(&tamper_signature(&raw)).unwrap();

        assert!(!verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_modified_payload_fails() {
        let key = TestKey::new(TestKeyId::K1);
        let original = TestTokenBuilder::new().sign_with(&key);
        let forged = TestTokenBuilder::new()
            .permissions(&["delete:like"])
            .sign_with(&key);

        // Forged payload with the original signature
        let mut original_parts = original.split('.');
        let mut forged_parts = forged.split('.');
        let header = original_parts.next().unwrap();
        let payload = forged_parts.nth(1).unwrap();
        let signature = original_parts.nth(1).unwrap();
        let spliced = format!("{header}.{payload}.{signature}");

        let token = parse(&spliced).unwrap();
        assert!(!verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_non_rs256_algorithm_rejected() {
        let raw = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let downgraded = replace_header(&raw, &serde_json::json!({ "alg": "HS256", "kid": "k1" }));
        let token = parse(&downgraded).unwrap();

        assert!(!verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let raw = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let unsigned = replace_header(&raw, &serde_json::json!({ "alg": "none", "kid": "k1" }));
        let token = parse(&unsigned).unwrap();

        assert!(!verify(&token, &signing_key(TestKeyId::K1)));
    }

    #[test]
    fn test_mismatched_key_id_rejected() {
        let raw = TestTokenBuilder::new().sign_with(&TestKey::new(TestKeyId::K1));
        let token = parse(&raw).unwrap();

        assert!(!verify(&token, &signing_key(TestKeyId::K2)));
    }
}
