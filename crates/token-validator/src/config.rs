//! Token validator configuration.
//!
//! Configuration is loaded from environment variables. The Redis URL is
//! redacted in Debug output because it may carry credentials.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default issuer URL template. `{region}` is substituted with the region.
pub const DEFAULT_ISSUER_TEMPLATE: &str = "https://cognito-idp.{region}.amazonaws.com";

/// Default per-key cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHING_TIMEOUT_SECONDS: u64 = 300;

/// Default prefix for cached key entries.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "jwk:";

/// Default timeout for the JWKS HTTP request.
pub const DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS HTTP request timeout.
pub const MAX_JWKS_HTTP_TIMEOUT_SECONDS: u64 = 60;

/// Upper bound for `exp`/`nbf` leeway (10 minutes).
pub const MAX_LEEWAY_SECONDS: u64 = 600;

/// Default timeout for a single cache store command.
pub const DEFAULT_STORE_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Key caching policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Consult the external store before fetching the key set.
    pub enabled: bool,

    /// Expiry applied to every stored entry.
    pub timeout: Duration,

    /// Prefix prepended to the key ID to form the store key.
    pub key_prefix: String,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: Duration::from_secs(DEFAULT_CACHING_TIMEOUT_SECONDS),
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
        }
    }
}

/// Token validator configuration.
#[derive(Clone)]
pub struct ValidatorConfig {
    /// Identity provider region (e.g., "eu-west-1").
    pub region: String,

    /// User pool identifier within the region.
    pub user_pool_id: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Issuer URL template; `{region}` is substituted.
    pub issuer_template: String,

    /// Key caching policy.
    pub cache: CachePolicy,

    /// Timeout for the JWKS HTTP request.
    pub jwks_http_timeout: Duration,

    /// Leeway in seconds applied to `exp` and `nbf`.
    pub leeway_seconds: u64,

    /// Redis URL backing the key cache (optional).
    pub redis_url: Option<SecretString>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("region", &self.region)
            .field("user_pool_id", &self.user_pool_id)
            .field("audience", &self.audience)
            .field("issuer_template", &self.issuer_template)
            .field("cache", &self.cache)
            .field("jwks_http_timeout", &self.jwks_http_timeout)
            .field("leeway_seconds", &self.leeway_seconds)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuer(String),

    #[error("Invalid caching configuration: {0}")]
    InvalidCaching(String),

    #[error("Invalid JWKS HTTP timeout configuration: {0}")]
    InvalidHttpTimeout(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidLeeway(String),

    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let region = required(vars, "IDP_REGION")?;
        let user_pool_id = required(vars, "IDP_USER_POOL_ID")?;
        let audience = required(vars, "IDP_AUDIENCE")?;

        let issuer_template = vars
            .get("IDP_ISSUER_TEMPLATE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISSUER_TEMPLATE.to_string());

        let enabled = match vars.get("PUBLIC_KEYS_CACHING_ENABLED") {
            Some(value) => parse_bool(value).ok_or_else(|| {
                ConfigError::InvalidCaching(format!(
                    "PUBLIC_KEYS_CACHING_ENABLED must be true or false, got '{}'",
                    value
                ))
            })?,
            None => false,
        };

        // Parse cache TTL with validation
        let timeout_seconds = if let Some(value_str) = vars.get("PUBLIC_KEYS_CACHING_TIMEOUT") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCaching(format!(
                    "PUBLIC_KEYS_CACHING_TIMEOUT must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidCaching(
                    "PUBLIC_KEYS_CACHING_TIMEOUT must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_CACHING_TIMEOUT_SECONDS
        };

        let key_prefix = vars
            .get("PUBLIC_KEYS_CACHE_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string());

        // Parse HTTP timeout with validation
        let jwks_http_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_HTTP_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidHttpTimeout(format!(
                        "JWKS_HTTP_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_HTTP_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidHttpTimeout(format!(
                        "JWKS_HTTP_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_JWKS_HTTP_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS
            };

        // Parse leeway with validation
        let leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_LEEWAY_SECONDS {
                return Err(ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_LEEWAY_SECONDS, value
                )));
            }

            value
        } else {
            0
        };

        let redis_url = vars
            .get("REDIS_URL")
            .filter(|url| !url.is_empty())
            .map(|url| SecretString::from(url.clone()));

        Ok(Self {
            region,
            user_pool_id,
            audience,
            issuer_template,
            cache: CachePolicy {
                enabled,
                timeout: Duration::from_secs(timeout_seconds),
                key_prefix,
            },
            jwks_http_timeout: Duration::from_secs(jwks_http_timeout_seconds),
            leeway_seconds,
            redis_url,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
