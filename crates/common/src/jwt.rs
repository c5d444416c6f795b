//! Compact signed-token parsing shared across authorizer components.
//!
//! This module turns a raw bearer string into a [`Token`]: the decoded header,
//! the decoded claims, the raw signature bytes, and the original encoded
//! segments needed to reconstruct the signing input.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding (DoS prevention)
//! - Parsing does NOT verify the signature; callers must verify against the
//!   key selected by [`TokenHeader::kid`] before trusting any claim
//! - Error messages are generic; the variant carries the cause for logs only
//! - The `sub` claim is redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::parse;
//!
//! let token = parse("Bearer eyJhbGciOi...")?;
//! let key = key_provider.get_key(&token.header().kid).await?;
//! verify(&token, &key);
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected before any base64 or JSON decoding.
/// Issuer access tokens with a permissions claim are typically under 2KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Authorization scheme prefix stripped from raw bearer strings.
pub const BEARER_PREFIX: &str = "Bearer ";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing a compact signed token.
///
/// All variants display the same generic message to prevent information
/// leakage. Match on the variant when logging the actual cause.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No token was supplied, or only the scheme prefix.
    #[error("The access token is invalid or expired")]
    MissingToken,

    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token does not split into exactly three dot-separated segments.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Header segment is not base64url-encoded JSON with an `alg`.
    #[error("The access token is invalid or expired")]
    MalformedHeader,

    /// Header is missing a non-empty string `kid`.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Payload segment is not base64url-encoded JSON with the required claims.
    #[error("The access token is invalid or expired")]
    MalformedPayload,

    /// Signature segment is not valid base64url.
    #[error("The access token is invalid or expired")]
    MalformedSignature,
}

impl ParseError {
    /// Short, stable identifier for logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseError::MissingToken => "missing_token",
            ParseError::TokenTooLarge => "token_too_large",
            ParseError::MalformedToken => "malformed_token",
            ParseError::MalformedHeader => "malformed_header",
            ParseError::MissingKid => "missing_kid",
            ParseError::MalformedPayload => "malformed_payload",
            ParseError::MalformedSignature => "malformed_signature",
        }
    }
}

// =============================================================================
// Token Types
// =============================================================================

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signature algorithm (e.g. `RS256`).
    pub alg: String,

    /// Key identifier selecting the issuer key that signed the token.
    pub kid: String,
}

/// Claims carried in the token payload.
///
/// # Fields
///
/// - `sub`: Subject (user identifier), redacted in Debug output
/// - `azp`: Authorized party (client id the token was issued to)
/// - `exp`: Expiration timestamp (Unix epoch seconds)
/// - `permissions`: Optional fine-grained permission strings
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - redacted in Debug output.
    pub sub: String,

    /// Authorized party.
    pub azp: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Fine-grained permissions granted to this token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("azp", &self.azp)
            .field("exp", &self.exp)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl Claims {
    /// Check whether the `permissions` claim contains `permission`.
    ///
    /// Returns `false` when the claim is absent.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|perms| perms.iter().any(|p| p == permission))
    }
}

/// A parsed, NOT yet verified, compact signed token.
///
/// Keeps the original encoded header and payload segments so the signing
/// input can be reconstructed byte-for-byte.
#[derive(Clone)]
pub struct Token {
    header_raw: String,
    payload_raw: String,
    header: TokenHeader,
    claims: Claims,
    signature: Vec<u8>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("signature_len", &self.signature.len())
            .finish_non_exhaustive()
    }
}

impl Token {
    /// Decoded header.
    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Decoded claims. Untrusted until the signature has been verified.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Raw signature bytes (base64url-decoded third segment).
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Original encoded header segment.
    #[must_use]
    pub fn header_raw(&self) -> &str {
        &self.header_raw
    }

    /// Original encoded payload segment.
    #[must_use]
    pub fn payload_raw(&self) -> &str {
        &self.payload_raw
    }

    /// The exact byte string the issuer signed: `header_raw + "." + payload_raw`.
    ///
    /// Built from the original encoded segments, never from re-serialized JSON.
    #[must_use]
    pub fn signing_input(&self) -> String {
        let mut input = String::with_capacity(self.header_raw.len() + self.payload_raw.len() + 1);
        input.push_str(&self.header_raw);
        input.push('.');
        input.push_str(&self.payload_raw);
        input
    }

    /// Consume the token, returning its claims.
    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Strip an optional `"Bearer "` scheme prefix and surrounding whitespace.
#[must_use]
pub fn strip_bearer(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    trimmed.strip_prefix(BEARER_PREFIX).unwrap_or(trimmed).trim()
}

/// Parse a raw bearer string into a [`Token`].
///
/// # Errors
///
/// Returns a [`ParseError`] variant when the token is empty, oversized, does
/// not have exactly three segments, or any segment fails to decode.
pub fn parse(raw: &str) -> Result<Token, ParseError> {
    let token = strip_bearer(raw);

    if token.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty");
        return Err(ParseError::MissingToken);
    }

    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(ParseError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header_raw), Some(payload_raw), Some(signature_raw), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(
            target: "common.jwt",
            segments = token.split('.').count(),
            "Token rejected: invalid segment count"
        );
        return Err(ParseError::MalformedToken);
    };

    let header = decode_header(header_raw)?;
    let claims = decode_claims(payload_raw)?;

    let signature = URL_SAFE_NO_PAD.decode(signature_raw).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode signature base64");
        ParseError::MalformedSignature
    })?;

    Ok(Token {
        header_raw: header_raw.to_string(),
        payload_raw: payload_raw.to_string(),
        header,
        claims,
        signature,
    })
}

fn decode_header(segment: &str) -> Result<TokenHeader, ParseError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode header base64");
        ParseError::MalformedHeader
    })?;

    let header: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse header JSON");
        ParseError::MalformedHeader
    })?;

    let alg = header
        .get("alg")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or(ParseError::MalformedHeader)?;

    // Empty kid is rejected along with missing or non-string kid
    let kid = header
        .get("kid")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(ParseError::MissingKid)?;

    Ok(TokenHeader { alg, kid })
}

fn decode_claims(segment: &str) -> Result<Claims, ParseError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode payload base64");
        ParseError::MalformedPayload
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse payload claims");
        ParseError::MalformedPayload
    })
}

// =============================================================================
// Tests
// =============================================================================
