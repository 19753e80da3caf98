//! Key cache: decides whether a lookup is served from a previous result or
//! triggers a fresh key set fetch.
//!
//! # Policy
//!
//! - Caching disabled: the key set is fetched lazily, at most once per
//!   `KeyCache`, and reused for every later lookup. A failed fetch is not
//!   remembered, so the next lookup tries again.
//! - Caching enabled: the external store is asked for the `kid` first. Any
//!   hit is returned as stored, including a stored "no key" (`null`), which
//!   keeps unknown key IDs from hammering the issuer. On a miss the full key
//!   set is fetched, the entry for `kid` (or `null`) is written with the
//!   configured TTL and returned.
//!
//! Entries are per key ID, so one missing key never evicts the others.
//! The store is written only after a fetch succeeds; an issuer outage is
//! never remembered as "no key".

use crate::auth::issuer::IssuerEndpoint;
use crate::auth::jwks::{Jwk, KeySet, KeySetSource};
use crate::config::{CachePolicy, ConfigError};
use crate::errors::ValidationError;
use crate::observability::metrics;
use crate::store::KeyStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Per-key-ID lookup over a [`KeySetSource`], optionally memoized in a [`KeyStore`].
pub struct KeyCache {
    source: Arc<dyn KeySetSource>,
    store: Option<Arc<dyn KeyStore>>,
    policy: CachePolicy,

    /// Key set fetched on first use when store caching is off.
    memo: OnceCell<Arc<KeySet>>,
}

impl KeyCache {
    /// Create a key cache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCaching` if caching is enabled without a store.
    pub fn new(
        source: Arc<dyn KeySetSource>,
        store: Option<Arc<dyn KeyStore>>,
        policy: CachePolicy,
    ) -> Result<Self, ConfigError> {
        if policy.enabled && store.is_none() {
            return Err(ConfigError::InvalidCaching(
                "caching is enabled but no cache store is configured".to_string(),
            ));
        }

        Ok(Self {
            source,
            store,
            policy,
            memo: OnceCell::new(),
        })
    }

    /// Key cache without an external store.
    pub fn uncached(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            store: None,
            policy: CachePolicy::default(),
            memo: OnceCell::new(),
        }
    }

    /// Look up the key descriptor for `kid`; `Ok(None)` when the issuer has none.
    ///
    /// # Errors
    ///
    /// Propagates `Transport` and `Format` errors from the key set fetch.
    #[instrument(skip_all, fields(kid = %kid))]
    pub async fn get_key(
        &self,
        kid: &str,
        issuer: &IssuerEndpoint,
    ) -> Result<Option<Jwk>, ValidationError> {
        match &self.store {
            Some(store) if self.policy.enabled => self.get_key_cached(store.as_ref(), kid, issuer).await,
            _ => self.get_key_memoized(kid, issuer).await,
        }
    }

    async fn get_key_memoized(
        &self,
        kid: &str,
        issuer: &IssuerEndpoint,
    ) -> Result<Option<Jwk>, ValidationError> {
        let key_set = self
            .memo
            .get_or_try_init(|| async { self.source.fetch(issuer).await.map(Arc::new) })
            .await?;

        metrics::record_key_lookup("memo");
        Ok(key_set.get(kid).cloned())
    }

    async fn get_key_cached(
        &self,
        store: &dyn KeyStore,
        kid: &str,
        issuer: &IssuerEndpoint,
    ) -> Result<Option<Jwk>, ValidationError> {
        let store_key = format!("{}{}", self.policy.key_prefix, kid);

        let lookup = match store.get(&store_key).await {
            Ok(Some(stored)) => match serde_json::from_str::<Option<Jwk>>(&stored) {
                Ok(jwk) => {
                    tracing::debug!(target: "tv.cache", kid = %kid, found = jwk.is_some(), "Key cache hit");
                    metrics::record_key_lookup("hit");
                    return Ok(jwk);
                }
                Err(e) => {
                    tracing::warn!(target: "tv.cache", kid = %kid, error = %e, "Ignoring undecodable cache entry");
                    "miss"
                }
            },
            Ok(None) => "miss",
            Err(e) => {
                tracing::warn!(target: "tv.cache", kid = %kid, error = %e, "Cache store read failed, treating as miss");
                "store_error"
            }
        };

        // One label per lookup
        metrics::record_key_lookup(lookup);

        // Fetch errors propagate before anything is written
        let key_set = self.source.fetch(issuer).await?;
        let jwk = key_set.get(kid).cloned();

        match serde_json::to_string(&jwk) {
            Ok(value) => {
                if let Err(e) = store.set(&store_key, value, self.policy.timeout).await {
                    tracing::warn!(target: "tv.cache", kid = %kid, error = %e, "Cache store write failed");
                }
            }
            Err(e) => {
                tracing::warn!(target: "tv.cache", kid = %kid, error = %e, "Failed to encode key for cache");
            }
        }

        tracing::debug!(target: "tv.cache", kid = %kid, found = jwk.is_some(), "Key cache populated");
        Ok(jwk)
    }
}
