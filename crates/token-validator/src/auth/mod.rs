//! Token validation pipeline.
//!
//! ```text
//! TokenValidator::validate
//!   -> KeyResolver::resolve      (unverified header, kid)
//!     -> KeyCache::get_key       (store / memo policy)
//!       -> KeySetSource::fetch   (JWKS over HTTP)
//!   -> RS256 signature + aud / iss / exp / nbf
//! ```

pub mod issuer;
pub mod jwks;
pub mod key_cache;
pub mod resolver;
pub mod validator;
