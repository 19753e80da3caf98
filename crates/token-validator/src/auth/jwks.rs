//! JWKS fetching from the identity provider.
//!
//! The key set fetcher retrieves the issuer's `/.well-known/jwks.json`
//! document and turns it into a [`KeySet`] keyed by `kid`. It performs one
//! HTTP GET per call and never caches: caching policy lives in
//! [`crate::auth::key_cache`].
//!
//! # Errors
//!
//! - Connection failures, timeouts and non-2xx responses are `Transport`
//! - A body that is not `{"keys": [{"kid": ...}, ...]}` is `Format`

use crate::auth::issuer::IssuerEndpoint;
use crate::errors::ValidationError;
use crate::observability::metrics;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::instrument;

/// The only signature algorithm accepted for identity tokens.
pub const EXPECTED_ALGORITHM: &str = "RS256";

/// JSON Web Key published by the issuer.
///
/// Members this crate does not interpret are kept in `extra` so the
/// descriptor round-trips through the cache store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key type (always "RSA" for this provider).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,

    /// Algorithm (should be "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Any other members of the key object.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Jwk {
    /// Convert the descriptor into an RSA verification key.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Token` ("malformed key material") when the
    /// key is not an RS256 signing key or its components do not decode.
    pub fn to_decoding_key(&self) -> Result<DecodingKey, ValidationError> {
        if self.kty.as_deref() != Some("RSA") {
            tracing::warn!(target: "tv.jwks", kid = %self.kid, kty = ?self.kty, "Unexpected JWK key type");
            return Err(ValidationError::token(
                "malformed key material: key type is not RSA",
            ));
        }
        if let Some(alg) = &self.alg {
            if alg != EXPECTED_ALGORITHM {
                tracing::warn!(target: "tv.jwks", kid = %self.kid, alg = %alg, "Unexpected JWK algorithm");
                return Err(ValidationError::token(
                    "malformed key material: key algorithm is not RS256",
                ));
            }
        }
        if self.key_use.as_deref() == Some("enc") {
            return Err(ValidationError::token(
                "malformed key material: key is not a signing key",
            ));
        }

        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            tracing::error!(target: "tv.jwks", kid = %self.kid, "JWK missing RSA components");
            return Err(ValidationError::token(
                "malformed key material: missing RSA modulus or exponent",
            ));
        };

        DecodingKey::from_rsa_components(n, e).map_err(|e| {
            tracing::error!(target: "tv.jwks", kid = %self.kid, error = %e, "Invalid RSA key encoding");
            ValidationError::token(format!("malformed key material: {e}"))
        })
    }
}

/// JWKS document as served by the issuer.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

/// Verification keys from one fetch, keyed by `kid`.
///
/// Built wholesale from a single response and never partially updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    keys: HashMap<String, Jwk>,
}

impl KeySet {
    /// Build a key set from individual keys. Later duplicates of a `kid` win.
    pub fn from_keys(keys: impl IntoIterator<Item = Jwk>) -> Self {
        Self {
            keys: keys.into_iter().map(|key| (key.kid.clone(), key)).collect(),
        }
    }

    /// Parse a JWKS document.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Format` unless the body is a JSON object with
    /// a `keys` array whose elements are objects carrying a string `kid`.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let document: JwksDocument = serde_json::from_slice(body).map_err(|e| {
            tracing::error!(target: "tv.jwks", error = %e, "Failed to parse JWKS response");
            ValidationError::Format(format!("expected a JSON object with a keys array: {e}"))
        })?;

        let declared = document.keys.len();
        let key_set = Self::from_keys(document.keys);
        if key_set.len() != declared {
            tracing::warn!(
                target: "tv.jwks",
                declared,
                distinct = key_set.len(),
                "JWKS contains duplicate key IDs"
            );
        }

        Ok(key_set)
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Source of the issuer's current key set.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the full key set published by `issuer`.
    async fn fetch(&self, issuer: &IssuerEndpoint) -> Result<KeySet, ValidationError>;
}

/// Fetches the key set over HTTP(S) with a bounded request timeout.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "tv.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn fetch_once(&self, url: &str) -> Result<KeySet, ValidationError> {
        tracing::debug!(target: "tv.jwks", url = %url, "Fetching JWKS from issuer");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "tv.jwks", error = %e, "Failed to fetch JWKS");
            ValidationError::Transport(format!("request to {url} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "tv.jwks", status = %status, "JWKS endpoint returned error");
            return Err(ValidationError::Transport(format!(
                "{url} returned HTTP {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "tv.jwks", error = %e, "Failed to read JWKS response body");
            ValidationError::Transport(format!("reading response from {url} failed: {e}"))
        })?;

        let key_set = KeySet::parse(&body)?;

        tracing::info!(target: "tv.jwks", key_count = key_set.len(), "JWKS fetched");

        Ok(key_set)
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetFetcher {
    #[instrument(skip_all, fields(issuer = %issuer))]
    async fn fetch(&self, issuer: &IssuerEndpoint) -> Result<KeySet, ValidationError> {
        let start = Instant::now();
        let result = self.fetch_once(&issuer.jwks_url()).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_fetch(status, start.elapsed());

        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use token_test_utils::crypto_fixtures::{KEY_A_MODULUS, RSA_EXPONENT};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kid: kid.to_string(),
            kty: Some("RSA".to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(KEY_A_MODULUS.to_string()),
            e: Some(RSA_EXPONENT.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    fn issuer_for(server: &MockServer) -> IssuerEndpoint {
        IssuerEndpoint::new(&format!("{}/{{region}}", server.uri()), "region1", "poolA").unwrap()
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "alg": "RS256",
            "e": "AQAB",
            "kid": "kid1",
            "kty": "RSA",
            "n": "xlvUVx6W",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kid, "kid1");
        assert_eq!(jwk.kty.as_deref(), Some("RSA"));
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.n.as_deref(), Some("xlvUVx6W"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.extra.is_empty());
    }

    #[test]
    fn test_jwk_preserves_unknown_members() {
        let json = r#"{"kid":"kid1","kty":"RSA","x5t":"thumb","x5c":["cert"]}"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();
        assert_eq!(jwk.extra.get("x5t").unwrap(), "thumb");

        let round_trip: serde_json::Value = serde_json::to_value(&jwk).unwrap();
        let original: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(round_trip, original);
    }

    #[test]
    fn test_key_set_parse() {
        let body = br#"{"keys":[{"kid":"key-1","kty":"RSA"},{"kid":"key-2","kty":"RSA"}]}"#;

        let key_set = KeySet::parse(body).unwrap();
        assert_eq!(key_set.len(), 2);
        assert!(key_set.get("key-1").is_some());
        assert!(key_set.get("key-2").is_some());
        assert!(key_set.get("key-3").is_none());
    }

    #[test]
    fn test_key_set_parse_empty_keys_is_valid() {
        let key_set = KeySet::parse(br#"{"keys":[]}"#).unwrap();
        assert!(key_set.is_empty());
    }

    #[test]
    fn test_key_set_parse_rejects_bad_documents() {
        let bad_bodies: [&[u8]; 6] = [
            b"not json",
            br#"[{"kid":"key-1"}]"#,
            br#"{"no_keys":[]}"#,
            br#"{"keys":{"kid":"key-1"}}"#,
            br#"{"keys":[{"kty":"RSA"}]}"#,
            br#"{"keys":[{"kid":42}]}"#,
        ];

        for body in bad_bodies {
            let result = KeySet::parse(body);
            assert!(
                matches!(result, Err(ValidationError::Format(_))),
                "expected Format error for {:?}, got {:?}",
                String::from_utf8_lossy(body),
                result
            );
        }
    }

    #[test]
    fn test_to_decoding_key_accepts_rs256_key() {
        assert!(rsa_jwk("kid1").to_decoding_key().is_ok());
    }

    #[test]
    fn test_to_decoding_key_accepts_key_without_alg() {
        let mut jwk = rsa_jwk("kid1");
        jwk.alg = None;
        assert!(jwk.to_decoding_key().is_ok());
    }

    #[test]
    fn test_to_decoding_key_rejects_non_rsa_key_type() {
        let mut jwk = rsa_jwk("kid1");
        jwk.kty = Some("EC".to_string());

        let err = jwk.to_decoding_key().err().unwrap();
        assert!(err.is_token_error());
        assert!(err.reason().contains("malformed key material"));
    }

    #[test]
    fn test_to_decoding_key_rejects_other_algorithm() {
        let mut jwk = rsa_jwk("kid1");
        jwk.alg = Some("RS512".to_string());
        assert!(jwk.to_decoding_key().is_err());
    }

    #[test]
    fn test_to_decoding_key_rejects_encryption_key() {
        let mut jwk = rsa_jwk("kid1");
        jwk.key_use = Some("enc".to_string());
        assert!(jwk.to_decoding_key().is_err());
    }

    #[test]
    fn test_to_decoding_key_rejects_missing_components() {
        let mut jwk = rsa_jwk("kid1");
        jwk.n = None;
        assert!(jwk.to_decoding_key().is_err());

        let mut jwk = rsa_jwk("kid1");
        jwk.e = None;
        assert!(jwk.to_decoding_key().is_err());
    }

    #[test]
    fn test_to_decoding_key_rejects_invalid_base64() {
        let mut jwk = rsa_jwk("kid1");
        jwk.n = Some("!!!invalid-base64!!!".to_string());

        let err = jwk.to_decoding_key().err().unwrap();
        assert!(err.reason().starts_with("malformed key material"));
    }

    #[tokio::test]
    async fn test_fetch_returns_key_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/region1/poolA/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [rsa_jwk("kid1"), rsa_jwk("kid2")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpKeySetFetcher::new(Duration::from_secs(5));
        let key_set = fetcher.fetch(&issuer_for(&server)).await.unwrap();

        assert_eq!(key_set.len(), 2);
        assert_eq!(key_set.get("kid1").unwrap(), &rsa_jwk("kid1"));
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpKeySetFetcher::new(Duration::from_secs(5));
        let result = fetcher.fetch(&issuer_for(&server)).await;

        assert!(
            matches!(&result, Err(ValidationError::Transport(msg)) if msg.contains("503")),
            "expected Transport error, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_fetch_invalid_body_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpKeySetFetcher::new(Duration::from_secs(5));
        let result = fetcher.fetch(&issuer_for(&server)).await;

        assert!(matches!(result, Err(ValidationError::Format(_))));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"keys": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpKeySetFetcher::new(Duration::from_millis(200));
        let result = fetcher.fetch(&issuer_for(&server)).await;

        assert!(matches!(result, Err(ValidationError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        // Port 9 (discard) on localhost is not served in test environments
        let issuer = IssuerEndpoint::new("http://127.0.0.1:9/{region}", "region1", "poolA").unwrap();

        let fetcher = HttpKeySetFetcher::new(Duration::from_secs(2));
        let result = fetcher.fetch(&issuer).await;

        assert!(matches!(result, Err(ValidationError::Transport(_))));
    }
}
