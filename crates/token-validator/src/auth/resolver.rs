//! Key resolution: token header -> verification key.
//!
//! Only the key whose ID the token declares is ever used. There is no
//! fallback to another key or to a previously used one.

use crate::auth::issuer::IssuerEndpoint;
use crate::auth::key_cache::KeyCache;
use crate::errors::ValidationError;
use common::jwt::{extract_header, UnverifiedHeader};
use jsonwebtoken::DecodingKey;
use std::fmt;
use tracing::instrument;

/// Verification key selected for one token.
#[derive(Clone)]
pub struct ResolvedKey {
    /// Unverified header the key was selected by.
    pub header: UnverifiedHeader,

    /// RSA public key for signature verification.
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedKey")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Picks the verification key for a token via the [`KeyCache`].
pub struct KeyResolver {
    key_cache: KeyCache,
}

impl KeyResolver {
    pub fn new(key_cache: KeyCache) -> Self {
        Self { key_cache }
    }

    /// Resolve the verification key for `token`.
    ///
    /// # Errors
    ///
    /// - `Token("malformed header")` if the header cannot be read
    /// - `Token("no key found")` if the issuer has no key with the declared `kid`
    /// - `Token("malformed key material ...")` if the key cannot be converted
    /// - `Transport` / `Format` from the key set fetch, unchanged
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        token: &str,
        issuer: &IssuerEndpoint,
    ) -> Result<ResolvedKey, ValidationError> {
        let header = extract_header(token).map_err(|e| {
            tracing::debug!(target: "tv.resolver", error = %e, "Token header extraction failed");
            ValidationError::from(e)
        })?;

        let jwk = self
            .key_cache
            .get_key(&header.kid, issuer)
            .await?
            .ok_or_else(|| {
                tracing::debug!(target: "tv.resolver", kid = %header.kid, "No key found for token");
                ValidationError::token("no key found")
            })?;

        let decoding_key = jwk.to_decoding_key()?;

        Ok(ResolvedKey {
            header,
            decoding_key,
        })
    }
}
