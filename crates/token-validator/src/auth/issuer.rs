//! Issuer endpoint derivation.
//!
//! The issuer endpoint is both the prefix of the JWKS URL and the exact
//! value expected in the `iss` claim. It is computed once per validator.

use crate::config::ConfigError;
use std::fmt;
use std::sync::Arc;

/// Placeholder substituted with the region in issuer templates.
pub const REGION_PLACEHOLDER: &str = "{region}";

/// Path of the key set document relative to the issuer endpoint.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Immutable issuer URL, e.g. `https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IssuerEndpoint(Arc<str>);

impl IssuerEndpoint {
    /// Derive the endpoint from a URL template, a region and a pool ID.
    ///
    /// The template may contain `{region}`; a trailing `/` is dropped before
    /// the pool ID is appended.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidIssuer` if any component is blank or the
    /// template is not an http(s) URL.
    pub fn new(template: &str, region: &str, pool_id: &str) -> Result<Self, ConfigError> {
        if region.trim().is_empty() {
            return Err(ConfigError::InvalidIssuer("region must not be empty".to_string()));
        }
        if pool_id.trim().is_empty() || pool_id.contains('/') {
            return Err(ConfigError::InvalidIssuer(format!(
                "user pool id must be a single non-empty path segment, got '{}'",
                pool_id
            )));
        }
        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(ConfigError::InvalidIssuer(format!(
                "issuer template must be an http(s) URL, got '{}'",
                template
            )));
        }

        let base = template.replace(REGION_PLACEHOLDER, region);
        let base = base.trim_end_matches('/');

        Ok(Self(Arc::from(format!("{}/{}", base, pool_id))))
    }

    /// The endpoint as a string (also the expected `iss` claim).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the issuer's public key set.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.0, JWKS_PATH)
    }
}

impl fmt::Display for IssuerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for IssuerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IssuerEndpoint").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ISSUER_TEMPLATE;

    #[test]
    fn test_default_template_yields_provider_url() {
        let issuer =
            IssuerEndpoint::new(DEFAULT_ISSUER_TEMPLATE, "eu-west-1", "eu-west-1_AbCdEf").unwrap();

        assert_eq!(
            issuer.as_str(),
            "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf"
        );
        assert_eq!(
            issuer.jwks_url(),
            "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_region_as_path_segment() {
        let issuer = IssuerEndpoint::new("https://idp.example/{region}", "region1", "poolA").unwrap();
        assert_eq!(issuer.as_str(), "https://idp.example/region1/poolA");
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let issuer = IssuerEndpoint::new("http://127.0.0.1:9000/{region}/", "r", "p").unwrap();
        assert_eq!(issuer.as_str(), "http://127.0.0.1:9000/r/p");
    }

    #[test]
    fn test_rejects_blank_components() {
        assert!(IssuerEndpoint::new(DEFAULT_ISSUER_TEMPLATE, "", "pool").is_err());
        assert!(IssuerEndpoint::new(DEFAULT_ISSUER_TEMPLATE, "eu-west-1", " ").is_err());
        assert!(IssuerEndpoint::new(DEFAULT_ISSUER_TEMPLATE, "eu-west-1", "a/b").is_err());
    }

    #[test]
    fn test_rejects_non_http_template() {
        let result = IssuerEndpoint::new("ftp://idp.example/{region}", "r", "p");
        assert!(matches!(result, Err(ConfigError::InvalidIssuer(_))));
    }

    #[test]
    fn test_display_matches_as_str() {
        let issuer = IssuerEndpoint::new("https://idp.example/{region}", "region1", "poolA").unwrap();
        assert_eq!(issuer.to_string(), issuer.as_str());
    }
}
