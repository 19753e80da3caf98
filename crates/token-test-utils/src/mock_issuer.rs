//! Mock identity provider serving a JWKS document over HTTP.

use crate::crypto_fixtures::TestKeypair;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_REGION: &str = "region1";
pub const TEST_POOL_ID: &str = "poolA";

/// A wiremock server standing in for the issuer.
///
/// Its issuer template is `<server>/{region}`, so the issuer endpoint for
/// region `r` and pool `p` is `<server>/r/p` and the key set is served at
/// `<server>/r/p/.well-known/jwks.json`.
pub struct MockIssuer {
    server: MockServer,
    region: String,
    pool_id: String,
}

impl MockIssuer {
    /// Start a server for [`TEST_REGION`] / [`TEST_POOL_ID`].
    pub async fn start() -> Self {
        Self::start_for(TEST_REGION, TEST_POOL_ID).await
    }

    pub async fn start_for(region: &str, pool_id: &str) -> Self {
        Self {
            server: MockServer::start().await,
            region: region.to_string(),
            pool_id: pool_id.to_string(),
        }
    }

    /// Template to configure the validator with.
    pub fn issuer_template(&self) -> String {
        format!("{}/{{region}}", self.server.uri())
    }

    /// The `iss` value tokens from this issuer carry.
    pub fn issuer_url(&self) -> String {
        format!("{}/{}/{}", self.server.uri(), self.region, self.pool_id)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn jwks_path(&self) -> String {
        format!("/{}/{}/.well-known/jwks.json", self.region, self.pool_id)
    }

    /// Serve the public halves of `keypairs`, expecting exactly `calls` fetches.
    pub async fn serve_keys(&self, keypairs: &[&TestKeypair], calls: u64) {
        let keys: Vec<Value> = keypairs.iter().map(|k| k.jwk_json()).collect();
        self.serve_json(json!({ "keys": keys }), calls).await;
    }

    /// Serve an arbitrary JSON body, expecting exactly `calls` fetches.
    pub async fn serve_json(&self, body: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Respond with `status` for the next `times` fetches.
    ///
    /// Mount before any success mock so the failures are served first.
    pub async fn fail_with(&self, status: u16, times: u64) {
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(times)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Respond with a 200 whose body is not a key set.
    pub async fn serve_garbage(&self, calls: u64) {
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Number of requests the server has seen.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }
}
