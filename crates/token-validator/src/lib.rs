//! Token Validator Library
//!
//! Validates identity tokens (JWTs) issued by a federated identity provider
//! that publishes its public keys at `<issuer>/.well-known/jwks.json`.
//! A token is accepted only if it is RS256-signed by the key its header
//! names, is addressed to the configured audience and issuer, and is within
//! its validity window.
//!
//! # Modules
//!
//! - `auth` - Issuer endpoint, JWKS fetching, key cache, resolver, validator
//! - `store` - External cache store collaborators (in-memory, Redis)
//! - `config` - Configuration from environment
//! - `errors` - Validation error taxonomy
//! - `observability` - Metrics
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = ValidatorConfig::from_env()?;
//! let validator = TokenValidator::from_config(&config).await?;
//!
//! match validator.validate(token).await {
//!     Ok(claims) => { /* trusted caller */ }
//!     Err(e) if e.is_token_error() => { /* reject with 401 */ }
//!     Err(e) => { /* issuer unavailable, 503 */ }
//! }
//! ```

pub mod auth;
pub mod config;
pub mod errors;
pub mod observability;
pub mod store;

pub use auth::issuer::IssuerEndpoint;
pub use auth::jwks::{HttpKeySetFetcher, Jwk, KeySet, KeySetSource};
pub use auth::key_cache::KeyCache;
pub use auth::resolver::{KeyResolver, ResolvedKey};
pub use auth::validator::{provider_validator, ClaimSet, TokenValidator, TokenValidatorBuilder};
pub use config::{CachePolicy, ConfigError, ValidatorConfig};
pub use errors::ValidationError;
pub use store::{InMemoryKeyStore, KeyStore, RedisKeyStore, StoreError};
