//! Common utilities shared across the authorizer workspace.

#![warn(clippy::pedantic)]

/// Module for compact signed-token parsing (header, claims, signature bytes)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for OAuth 2.0 client-credentials token acquisition
pub mod client_credentials;
