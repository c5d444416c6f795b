//! Authorizer Service Library
//!
//! Token authorizer for an API gateway. Given a bearer token and the ARN of
//! the method being invoked it returns an Allow or Deny policy document:
//!
//! - Signing keys come from the issuer's key-discovery endpoint (cached)
//! - Signatures are RS256 over the token exactly as received
//! - Claims are checked for the calling client, expiry and per-resource
//!   permissions
//!
//! The same authorizer guards the service's own `/v1/like` and `/v1/rank`
//! routes.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/authorize.rs -> handlers/*.rs -> services/*.rs
//!                          |
//!                          v
//!                  auth/authorizer.rs -> auth/{jwks,verify,rules,policy}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token authorization core
//! - `config` - Service configuration from environment
//! - `errors` - HTTP error types with status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Route guard and HTTP metrics
//! - `models` - Response bodies
//! - `observability` - Metrics
//! - `routes` - Axum router setup
//! - `services` - Counter store and role manager collaborators

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
