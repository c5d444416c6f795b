//! # Authorizer Test Utilities
//!
//! Shared test utilities for the authorizer service.
//!
//! This crate provides:
//! - Fixed RSA keys and certificates (reproducible signatures)
//! - Test token builders and tampering helpers
//! - Mock issuer endpoints (key set, token endpoint) on `wiremock`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = wiremock::MockServer::start().await;
//!     mount_jwks(&server, &published_keys(), None).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .permissions(&["delete:like"])
//!         .sign_with(&TestKey::new(TestKeyId::K1));
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;
