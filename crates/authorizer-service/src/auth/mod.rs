//! Token authorization.
//!
//! - `keys` - signing keys, key sets and the [`KeyProvider`] seam
//! - `jwks` - issuer-backed key provider with caching
//! - `verify` - RS256 signature verification
//! - `rules` - claims validation and permission table
//! - `policy` - policy synthesis
//! - `request` - invocation input
//! - `authorizer` - the orchestrator tying them together

pub mod authorizer;
pub mod jwks;
pub mod keys;
pub mod policy;
pub mod request;
pub mod rules;
pub mod verify;

pub use authorizer::{AuthorizationOutcome, Authorizer, DenyReason};
pub use jwks::JwksKeyProvider;
pub use keys::{KeyLookupError, KeyProvider, SigningKey, StaticKeyProvider};
pub use policy::{AuthorizationDecision, AuthorizerResponse, Effect};
pub use request::{AuthorizationRequest, AuthorizerEvent};
pub use rules::{ClaimViolation, PermissionRule, PermissionRules};
