//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across the authorizer. Any struct
//! that derives `Debug` and holds a `SecretString` prints `[REDACTED]` for
//! that field, so configuration and credential structs are safe to trace.
//!
//! Use `SecretString` for:
//! - The machine-to-machine client secret
//! - Management API access tokens obtained via client credentials
//! - Connection strings that embed passwords
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct M2mCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = M2mCredentials {
//!     client_id: "m2m-client".to_string(),
//!     client_secret: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.client_secret.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
