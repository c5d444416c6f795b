//! Authorizer service configuration.
//!
//! Configuration is loaded from environment variables. Missing required
//! variables are fatal at startup, never a per-request denial. Sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default timeout for the key-discovery fetch in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the key-discovery fetch timeout in seconds.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Default minimum interval between refetches triggered by unknown key ids.
pub const DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Default method ARN prefix used when guarding this service's own routes.
pub const DEFAULT_API_ARN_PREFIX: &str = "arn:aws:execute-api:local:000000000000:authorizer/v1";

/// Default Redis URL for the counter store.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default counter record name.
pub const DEFAULT_COUNTER_KEY_NAME: &str = "like";

/// Credentials and target role for the identity management API.
#[derive(Clone)]
pub struct RoleManagerConfig {
    /// Machine-to-machine client identifier.
    pub client_id: String,

    /// Machine-to-machine client secret.
    pub client_secret: SecretString,

    /// Role granted and revoked by the rank endpoints.
    pub role_id: String,
}

impl fmt::Debug for RoleManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleManagerConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("role_id", &self.role_id)
            .finish()
    }
}

/// Authorizer service configuration.
#[derive(Clone)]
pub struct Config {
    /// Issuer host (or full base URL) publishing the signing keys.
    pub auth0_domain: String,

    /// Expected `azp` claim value.
    pub oidc_client_id: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for each key-discovery fetch.
    pub jwks_fetch_timeout: Duration,

    /// Minimum interval between refetches triggered by unknown key ids.
    pub jwks_refresh_cooldown: Duration,

    /// Method ARN prefix for this service's own guarded routes.
    pub api_arn_prefix: String,

    /// Redis connection URL for the counter store.
    pub redis_url: String,

    /// Counter record name.
    pub counter_key_name: String,

    /// Identity management API settings; `None` disables the rank endpoints.
    pub role_manager: Option<RoleManagerConfig>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth0_domain", &self.auth0_domain)
            .field("oidc_client_id", &self.oidc_client_id)
            .field("bind_address", &self.bind_address)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwks_refresh_cooldown", &self.jwks_refresh_cooldown)
            .field("api_arn_prefix", &self.api_arn_prefix)
            .field("redis_url", &"[REDACTED]")
            .field("counter_key_name", &self.counter_key_name)
            .field("role_manager", &self.role_manager)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Incomplete role manager configuration: {0}")]
    IncompleteRoleManager(String),

    #[error("Invalid API_ARN_PREFIX: {0}")]
    InvalidArnPrefix(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth0_domain = required(vars, "AUTH0_DOMAIN")?
            .trim_end_matches('/')
            .to_string();
        let oidc_client_id = required(vars, "OIDC_CLIENT_ID")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout = if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwks(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidJwks(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                )));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS)
        };

        // Parse refetch cooldown with validation
        let jwks_refresh_cooldown =
            if let Some(value_str) = vars.get("JWKS_REFRESH_COOLDOWN_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwks(format!(
                        "JWKS_REFRESH_COOLDOWN_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidJwks(
                        "JWKS_REFRESH_COOLDOWN_SECONDS must be greater than 0".to_string(),
                    ));
                }

                Duration::from_secs(value)
            } else {
                Duration::from_secs(DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS)
            };

        let api_arn_prefix = match vars.get("API_ARN_PREFIX") {
            Some(value) => validate_arn_prefix(value)?,
            None => DEFAULT_API_ARN_PREFIX.to_string(),
        };

        let redis_url = vars
            .get("REDIS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let counter_key_name = vars
            .get("COUNTER_KEY_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_COUNTER_KEY_NAME.to_string());

        let role_manager = role_manager_from_vars(vars)?;

        Ok(Config {
            auth0_domain,
            oidc_client_id,
            bind_address,
            jwks_fetch_timeout,
            jwks_refresh_cooldown,
            api_arn_prefix,
            redis_url,
            counter_key_name,
            role_manager,
        })
    }

    /// Base URL of the issuer.
    ///
    /// A bare host gets an `https://` scheme; an explicit scheme is kept as is.
    /// Trailing slashes are dropped.
    pub fn issuer_url(&self) -> String {
        let domain = self.auth0_domain.trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// Key-discovery endpoint URL.
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer_url())
    }
}

/// The prefix must end in exactly `{api}/{stage}`; the guard appends
/// `/{METHOD}/{path}` and the authorizer reads the method from the third
/// slash-delimited segment.
fn validate_arn_prefix(value: &str) -> Result<String, ConfigError> {
    let prefix = value.trim().trim_end_matches('/');
    let mut segments = prefix.split('/');

    let well_formed = match (segments.next(), segments.next(), segments.next()) {
        (Some(api), Some(stage), None) => !api.is_empty() && !stage.is_empty(),
        _ => false,
    };

    if !well_formed {
        return Err(ConfigError::InvalidArnPrefix(format!(
            "expected '{{api}}/{{stage}}' with exactly one '/', got '{}'",
            value
        )));
    }

    Ok(prefix.to_string())
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn role_manager_from_vars(
    vars: &HashMap<String, String>,
) -> Result<Option<RoleManagerConfig>, ConfigError> {
    const NAMES: [&str; 3] = ["M2M_CLIENT_ID", "M2M_CLIENT_SECRET", "GOLD_MEMBER_ROLE_ID"];

    let present: Vec<&str> = NAMES
        .iter()
        .copied()
        .filter(|name| vars.get(*name).is_some_and(|v| !v.trim().is_empty()))
        .collect();

    if present.is_empty() {
        return Ok(None);
    }

    if present.len() != NAMES.len() {
        let missing: Vec<&str> = NAMES
            .iter()
            .copied()
            .filter(|name| !present.contains(name))
            .collect();
        return Err(ConfigError::IncompleteRoleManager(format!(
            "missing {}",
            missing.join(", ")
        )));
    }

    Ok(Some(RoleManagerConfig {
        client_id: required(vars, "M2M_CLIENT_ID")?,
        client_secret: SecretString::from(required(vars, "M2M_CLIENT_SECRET")?),
        role_id: required(vars, "GOLD_MEMBER_ROLE_ID")?,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("AUTH0_DOMAIN".to_string(), "tenant.example.com".to_string()),
            ("OIDC_CLIENT_ID".to_string(), "app1".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.auth0_domain, "tenant.example.com");
        assert_eq!(config.oidc_client_id, "app1");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.jwks_fetch_timeout,
            Duration::from_secs(DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS)
        );
        assert_eq!(
            config.jwks_refresh_cooldown,
            Duration::from_secs(DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS)
        );
        assert_eq!(config.api_arn_prefix, DEFAULT_API_ARN_PREFIX);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.counter_key_name, DEFAULT_COUNTER_KEY_NAME);
        assert!(config.role_manager.is_none());
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "3".to_string());
        vars.insert("JWKS_REFRESH_COOLDOWN_SECONDS".to_string(), "120".to_string());
        vars.insert(
            "API_ARN_PREFIX".to_string(),
            "arn:aws:execute-api:ap-northeast-1:123:abc/prod/".to_string(),
        );
        vars.insert("REDIS_URL".to_string(), "redis://cache:6379".to_string());
        vars.insert("COUNTER_KEY_NAME".to_string(), "likes".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwks_fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.jwks_refresh_cooldown, Duration::from_secs(120));
        assert_eq!(
            config.api_arn_prefix,
            "arn:aws:execute-api:ap-northeast-1:123:abc/prod"
        );
        assert_eq!(config.redis_url, "redis://cache:6379");
        assert_eq!(config.counter_key_name, "likes");
    }

    #[test]
    fn test_from_vars_missing_auth0_domain() {
        let mut vars = base_vars();
        vars.remove("AUTH0_DOMAIN");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH0_DOMAIN"));
    }

    #[test]
    fn test_from_vars_missing_client_id() {
        let mut vars = base_vars();
        vars.remove("OIDC_CLIENT_ID");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "OIDC_CLIENT_ID"));
    }

    #[test]
    fn test_from_vars_empty_required_value_is_missing() {
        let mut vars = base_vars();
        vars.insert("OIDC_CLIENT_ID".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "OIDC_CLIENT_ID"));
    }

    #[test]
    fn test_jwks_timeout_rejects_zero_and_too_large() {
        for value in ["0", "61"] {
            let mut vars = base_vars();
            vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidJwks(msg)) if msg.contains("between 1 and 60"))
            );
        }
    }

    #[test]
    fn test_jwks_timeout_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "ten".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwks(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_refresh_cooldown_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWKS_REFRESH_COOLDOWN_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwks(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_arn_prefix_rejects_extra_or_missing_segments() {
        for value in [
            "arn:aws:execute-api:us-east-1:123:abc/prod/base",
            "arn:aws:execute-api:us-east-1:123:abc",
            "arn:aws:execute-api:us-east-1:123:abc//",
            "/prod",
        ] {
            let mut vars = base_vars();
            vars.insert("API_ARN_PREFIX".to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidArnPrefix(_))),
                "prefix {value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_arn_prefix_passes_validation() {
        assert_eq!(
            validate_arn_prefix(DEFAULT_API_ARN_PREFIX).unwrap(),
            DEFAULT_API_ARN_PREFIX
        );
    }

    #[test]
    fn test_role_manager_all_present() {
        let mut vars = base_vars();
        vars.insert("M2M_CLIENT_ID".to_string(), "m2m".to_string());
        vars.insert("M2M_CLIENT_SECRET".to_string(), "m2m-secret".to_string());
        vars.insert("GOLD_MEMBER_ROLE_ID".to_string(), "rol_gold".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        let role_manager = config.role_manager.expect("role manager configured");

        assert_eq!(role_manager.client_id, "m2m");
        assert_eq!(role_manager.client_secret.expose_secret(), "m2m-secret");
        assert_eq!(role_manager.role_id, "rol_gold");
    }

    #[test]
    fn test_role_manager_partial_is_error() {
        let mut vars = base_vars();
        vars.insert("M2M_CLIENT_ID".to_string(), "m2m".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::IncompleteRoleManager(msg)) if msg.contains("M2M_CLIENT_SECRET") && msg.contains("GOLD_MEMBER_ROLE_ID"))
        );
    }

    #[test]
    fn test_issuer_url_adds_https_scheme() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.issuer_url(), "https://tenant.example.com");
        assert_eq!(
            config.jwks_url(),
            "https://tenant.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_issuer_url_keeps_explicit_scheme() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH0_DOMAIN".to_string(),
            "http://127.0.0.1:4000/".to_string(),
        );

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.issuer_url(), "http://127.0.0.1:4000");
        assert_eq!(
            config.jwks_url(),
            "http://127.0.0.1:4000/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert(
            "REDIS_URL".to_string(),
            "redis://:hunter2@cache:6379".to_string(),
        );
        vars.insert("M2M_CLIENT_ID".to_string(), "m2m".to_string());
        vars.insert("M2M_CLIENT_SECRET".to_string(), "m2m-secret".to_string());
        vars.insert("GOLD_MEMBER_ROLE_ID".to_string(), "rol_gold".to_string());

        let config = Config::from_vars(&vars).unwrap();
        let debug_str = format!("{:?}", config);

        assert!(!debug_str.contains("hunter2"));
        assert!(!debug_str.contains("m2m-secret"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("tenant.example.com"));
    }
}
