//! Issuer signing keys and the key-provider seam.
//!
//! A [`SigningKey`] is built from the leaf X.509 certificate published in the
//! issuer's key-discovery document. Keys are grouped into an ordered
//! [`KeySet`] with unique key ids. [`KeyProvider`] is the lookup seam the
//! orchestrator depends on; [`StaticKeyProvider`] is a preloaded
//! implementation that never fetches.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use ring::signature::{UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use x509_parser::public_key::PublicKey as X509PublicKey;

/// Errors returned by a [`KeyProvider`] lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyLookupError {
    /// No key with the requested id is published by the issuer.
    #[error("Signing key not found")]
    NotFound,

    /// The key set could not be obtained (network, timeout, bad document).
    #[error("Signing keys unavailable: {0}")]
    Unavailable(String),
}

/// Errors building a [`SigningKey`] from a certificate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Certificate is not valid base64")]
    InvalidEncoding,

    #[error("Certificate could not be parsed: {0}")]
    InvalidCertificate(String),

    #[error("Certificate subject key is not an RSA key")]
    UnsupportedKeyType,
}

/// Errors parsing a key-discovery document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwksParseError {
    #[error("Invalid key-discovery document: {0}")]
    InvalidDocument(String),

    #[error("Key-discovery document contains no usable signing keys")]
    NoUsableKeys,
}

/// Opaque RSA public key handle for PKCS#1 v1.5 SHA-256 verification.
#[derive(Clone)]
pub struct RsaPublicKey(UnparsedPublicKey<Vec<u8>>);

impl RsaPublicKey {
    /// Wrap a DER-encoded PKCS#1 `RSAPublicKey`.
    pub fn from_pkcs1_der(der: Vec<u8>) -> Self {
        Self(UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, der))
    }

    /// Verify `signature` over `message`. Never panics; any failure is `false`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.0.verify(message, signature).is_ok()
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("der_len", &self.0.as_ref().len())
            .finish()
    }
}

/// An issuer signing key. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SigningKey {
    key_id: String,
    certificate_der: Vec<u8>,
    public_key: RsaPublicKey,
}

impl SigningKey {
    /// Build a key from a DER-encoded X.509 leaf certificate.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError` if the certificate does not parse or its
    /// subject public key is not RSA.
    pub fn from_certificate_der(
        key_id: impl Into<String>,
        certificate_der: Vec<u8>,
    ) -> Result<Self, CertificateError> {
        let public_key = {
            let (_, cert) = x509_parser::parse_x509_certificate(&certificate_der)
                .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?;
            let spki = cert.public_key();

            match spki.parsed() {
                Ok(X509PublicKey::RSA(_)) => {}
                _ => return Err(CertificateError::UnsupportedKeyType),
            }

            // For rsaEncryption the BIT STRING holds the PKCS#1 RSAPublicKey
            RsaPublicKey::from_pkcs1_der(spki.subject_public_key.data.to_vec())
        };

        Ok(Self {
            key_id: key_id.into(),
            certificate_der,
            public_key,
        })
    }

    /// Build a key from a standard-base64 `x5c` certificate entry.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::InvalidEncoding` for bad base64, otherwise
    /// as [`SigningKey::from_certificate_der`].
    pub fn from_x5c(key_id: impl Into<String>, x5c: &str) -> Result<Self, CertificateError> {
        let der = STANDARD
            .decode(x5c.trim())
            .map_err(|_| CertificateError::InvalidEncoding)?;
        Self::from_certificate_der(key_id, der)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

/// Ordered collection of signing keys with unique key ids.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<Arc<SigningKey>>,
    fetched_at: Instant,
}

impl KeySet {
    /// Build a key set. A repeated key id keeps the first occurrence.
    pub fn new(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        let mut unique: Vec<Arc<SigningKey>> = Vec::new();
        for key in keys {
            if unique.iter().any(|k| k.key_id() == key.key_id()) {
                tracing::warn!(
                    target: "authorizer.keys",
                    kid = %key.key_id(),
                    "Duplicate key id in key set, keeping first"
                );
                continue;
            }
            unique.push(Arc::new(key));
        }

        Self {
            keys: unique,
            fetched_at: Instant::now(),
        }
    }

    /// Look up a key by id.
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.iter().find(|k| k.key_id() == kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key ids in publication order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.key_id())
    }

    /// When this set was built.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// One entry of the key-discovery document.
#[derive(Debug, Deserialize)]
struct JwkEntry {
    #[serde(default)]
    kid: Option<String>,

    #[serde(default)]
    kty: Option<String>,

    #[serde(default, rename = "use")]
    key_use: Option<String>,

    /// Certificate chain, leaf first, standard base64 DER.
    #[serde(default)]
    x5c: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

/// Parse a key-discovery document into a [`KeySet`].
///
/// Entries without a key id or certificate, with a non-signing `use`, or
/// whose leaf certificate is unusable are skipped.
///
/// # Errors
///
/// - `JwksParseError::InvalidDocument` - body is not a `{"keys": [...]}` document
/// - `JwksParseError::NoUsableKeys` - no entry produced a key
pub fn parse_jwks(body: &[u8]) -> Result<KeySet, JwksParseError> {
    let document: JwksDocument = serde_json::from_slice(body)
        .map_err(|e| JwksParseError::InvalidDocument(e.to_string()))?;

    let mut keys = Vec::with_capacity(document.keys.len());
    for entry in document.keys {
        let Some(kid) = entry.kid.filter(|k| !k.is_empty()) else {
            tracing::warn!(target: "authorizer.keys", "Skipping JWK without kid");
            continue;
        };

        if entry.key_use.as_deref().is_some_and(|u| u != "sig") {
            tracing::debug!(target: "authorizer.keys", kid = %kid, "Skipping non-signing JWK");
            continue;
        }

        let Some(leaf) = entry.x5c.first() else {
            tracing::warn!(
                target: "authorizer.keys",
                kid = %kid,
                kty = ?entry.kty,
                "Skipping JWK without certificate chain"
            );
            continue;
        };

        match SigningKey::from_x5c(kid.clone(), leaf) {
            Ok(key) => keys.push(key),
            Err(e) => {
                tracing::warn!(
                    target: "authorizer.keys",
                    kid = %kid,
                    error = %e,
                    "Skipping JWK with unusable certificate"
                );
            }
        }
    }

    let key_set = KeySet::new(keys);
    if key_set.is_empty() {
        return Err(JwksParseError::NoUsableKeys);
    }

    Ok(key_set)
}

/// Lookup seam for issuer signing keys.
///
/// Implementations are long-lived, shared across concurrent requests, and
/// must be safe for concurrent reads.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Get the key whose id equals `kid`.
    async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyLookupError>;

    /// Number of keys currently cached (0 when nothing has been fetched).
    async fn key_count(&self) -> usize;
}

/// Preloaded key provider. Never fetches.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    keys: KeySet,
}

impl StaticKeyProvider {
    pub fn new(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        Self {
            keys: KeySet::new(keys),
        }
    }

    pub fn from_key_set(keys: KeySet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyLookupError> {
        self.keys.get(kid).ok_or(KeyLookupError::NotFound)
    }

    async fn key_count(&self) -> usize {
        self.keys.len()
    }
}
