//! Identity token validation.
//!
//! Validates incoming JWTs using public keys published by the identity
//! provider's JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; the header algorithm is pinned before the
//!   signature is evaluated
//! - The key is selected strictly by the token's `kid`
//! - `aud` and `iss` must match exactly; `exp` must be in the future and
//!   `nbf`, when present, in the past, both relative to the injected clock

use crate::auth::issuer::IssuerEndpoint;
use crate::auth::jwks::{HttpKeySetFetcher, KeySetSource, EXPECTED_ALGORITHM};
use crate::auth::key_cache::KeyCache;
use crate::auth::resolver::KeyResolver;
use crate::config::{
    CachePolicy, ConfigError, ValidatorConfig, DEFAULT_ISSUER_TEMPLATE,
    DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS, DEFAULT_STORE_COMMAND_TIMEOUT,
};
use crate::errors::ValidationError;
use crate::observability::metrics;
use crate::store::{InMemoryKeyStore, KeyStore, RedisKeyStore};
use common::clock::{Clock, SystemClock};
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Decoded claims of a valid token, exactly as encoded by the issuer.
pub type ClaimSet = serde_json::Map<String, serde_json::Value>;

/// Validates identity tokens for one issuer and audience.
///
/// Safe to share across tasks; every `validate` call is independent.
pub struct TokenValidator {
    issuer: IssuerEndpoint,
    audience: String,
    resolver: KeyResolver,
    clock: Arc<dyn Clock>,
    leeway_seconds: u64,
}

impl TokenValidator {
    /// Start assembling a validator.
    pub fn builder(
        issuer: IssuerEndpoint,
        audience: impl Into<String>,
    ) -> TokenValidatorBuilder {
        TokenValidatorBuilder::new(issuer, audience.into())
    }

    /// Build the production wiring from configuration.
    ///
    /// With caching enabled the key store is Redis when `REDIS_URL` is set
    /// and a process-local [`InMemoryKeyStore`] otherwise. With caching
    /// disabled no store is connected. The HTTP fetcher uses the configured
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid issuer, or when the configured
    /// Redis store cannot be reached.
    pub async fn from_config(config: &ValidatorConfig) -> Result<Self, ConfigError> {
        let issuer =
            IssuerEndpoint::new(&config.issuer_template, &config.region, &config.user_pool_id)?;

        let mut builder = Self::builder(issuer, config.audience.clone())
            .cache_policy(config.cache.clone())
            .http_timeout(config.jwks_http_timeout)
            .leeway_seconds(config.leeway_seconds);

        if config.cache.enabled {
            let store: Arc<dyn KeyStore> = match &config.redis_url {
                Some(url) => {
                    let store = RedisKeyStore::connect(url, DEFAULT_STORE_COMMAND_TIMEOUT)
                        .await
                        .map_err(|e| ConfigError::StoreUnavailable(e.to_string()))?;
                    Arc::new(store)
                }
                None => {
                    tracing::info!(target: "tv.validator", "No REDIS_URL configured, caching keys in process memory");
                    Arc::new(InMemoryKeyStore::new())
                }
            };
            builder = builder.key_store(store);
        }

        builder.build()
    }

    pub fn issuer(&self) -> &IssuerEndpoint {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Validate a token and return its claims.
    ///
    /// # Steps
    ///
    /// 1. Resolve the verification key by `kid` (size check, header parse,
    ///    key cache, JWK conversion)
    /// 2. Reject any header algorithm other than RS256
    /// 3. Verify the RS256 signature, `aud` and `iss`
    /// 4. Check `exp` and `nbf` against the clock
    ///
    /// # Errors
    ///
    /// `Token` for anything wrong with the token; `Transport` / `Format` when
    /// the key set could not be obtained.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        let result = self.validate_inner(token).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "tv.validator", "Token validated successfully");
                metrics::record_token_validation("success", None);
            }
            Err(e) => {
                tracing::debug!(target: "tv.validator", error = %e, "Token validation failed");
                metrics::record_token_validation("error", Some(e.kind()));
            }
        }

        result
    }

    async fn validate_inner(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        // 1. Resolve the key declared by the token
        let resolved = self.resolver.resolve(token, &self.issuer).await?;

        // 2. Pin the algorithm before touching the signature
        if resolved.header.alg != EXPECTED_ALGORITHM {
            tracing::warn!(target: "tv.validator", alg = %resolved.header.alg, "Rejected token with unexpected algorithm");
            return Err(ValidationError::token(
                "The specified alg value is not allowed",
            ));
        }

        // 3. Signature, audience, issuer
        let token_data = decode::<ClaimSet>(token, &resolved.decoding_key, &self.validation())?;
        let claims = token_data.claims;

        // 4. Time-based claims against the verification clock
        self.check_time_claims(&claims)?;

        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        // exp/nbf are evaluated against the injected clock below
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation
    }

    fn check_time_claims(&self, claims: &ClaimSet) -> Result<(), ValidationError> {
        let now = self.clock.now_unix();
        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);

        let exp = claims
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| ValidationError::token("Token is missing the \"exp\" claim"))?;
        if exp <= now.saturating_sub(leeway) {
            return Err(ValidationError::token("Signature has expired"));
        }

        if let Some(nbf) = claims.get("nbf") {
            let nbf = nbf
                .as_i64()
                .ok_or_else(|| ValidationError::token("Not Before claim (nbf) must be an integer"))?;
            if nbf > now.saturating_add(leeway) {
                return Err(ValidationError::token("The token is not yet valid (nbf)"));
            }
        }

        Ok(())
    }
}

/// Assembles a [`TokenValidator`] from its collaborators.
pub struct TokenValidatorBuilder {
    issuer: IssuerEndpoint,
    audience: String,
    source: Option<Arc<dyn KeySetSource>>,
    store: Option<Arc<dyn KeyStore>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    http_timeout: Duration,
    leeway_seconds: u64,
}

impl TokenValidatorBuilder {
    fn new(issuer: IssuerEndpoint, audience: String) -> Self {
        Self {
            issuer,
            audience,
            source: None,
            store: None,
            policy: CachePolicy::default(),
            clock: Arc::new(SystemClock),
            http_timeout: Duration::from_secs(DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS),
            leeway_seconds: 0,
        }
    }

    /// Use a custom key set source instead of the HTTP fetcher.
    pub fn key_set_source(mut self, source: Arc<dyn KeySetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// External store used when caching is enabled.
    pub fn key_store(mut self, store: Arc<dyn KeyStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clock used for `exp` / `nbf`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Request timeout for the default HTTP fetcher.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn leeway_seconds(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    /// Build the validator.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCaching` if caching is enabled without a
    /// store, `ConfigError::MissingEnvVar` if the audience is blank.
    pub fn build(self) -> Result<TokenValidator, ConfigError> {
        if self.audience.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("IDP_AUDIENCE".to_string()));
        }

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(HttpKeySetFetcher::new(self.http_timeout)));
        let key_cache = KeyCache::new(source, self.store, self.policy)?;

        Ok(TokenValidator {
            issuer: self.issuer,
            audience: self.audience,
            resolver: KeyResolver::new(key_cache),
            clock: self.clock,
            leeway_seconds: self.leeway_seconds,
        })
    }
}

/// Convenience: validator for the provider's default issuer template.
///
/// # Errors
///
/// Returns `ConfigError::InvalidIssuer` for a blank region or pool ID.
pub fn provider_validator(
    region: &str,
    user_pool_id: &str,
    audience: &str,
) -> Result<TokenValidator, ConfigError> {
    let issuer = IssuerEndpoint::new(DEFAULT_ISSUER_TEMPLATE, region, user_pool_id)?;
    TokenValidator::builder(issuer, audience).build()
}
