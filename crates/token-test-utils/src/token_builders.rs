//! Builder patterns for test token claims

use serde_json::{json, Map, Value};

/// Builder for identity token claims.
///
/// Timestamps are relative to an explicit `now` so tests can pair the
/// claims with a fixed verification clock.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new(ISSUER, "my-app", NOW)
///     .for_user("alice")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    iss: String,
    aud: Value,
    sub: String,
    now: i64,
    exp: Option<i64>,
    nbf: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Claims for `issuer`/`audience`, issued at `now`, valid for an hour.
    pub fn new(issuer: &str, audience: &str, now: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            aud: json!(audience),
            sub: "test-subject".to_string(),
            now,
            exp: Some(now + 3600),
            nbf: None,
            extra: Map::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set a single audience
    pub fn audience(mut self, audience: &str) -> Self {
        self.aud = json!(audience);
        self
    }

    /// Set a list of audiences
    pub fn audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    /// Set the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from `now` (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some(self.now + seconds);
        self
    }

    /// Omit the `exp` claim
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set `nbf` in seconds from `now`
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some(self.now + seconds);
        self
    }

    /// Add an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.extra;
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("aud".to_string(), self.aud);
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iat".to_string(), json!(self.now));
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        Value::Object(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new("https://idp.example/region1/poolA", "my-app", NOW).build();

        assert_eq!(claims["iss"], "https://idp.example/region1/poolA");
        assert_eq!(claims["aud"], "my-app");
        assert_eq!(claims["exp"], NOW + 3600);
        assert!(claims.get("nbf").is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let claims = TestTokenBuilder::new("iss", "my-app", NOW)
            .audiences(&["a", "b"])
            .expires_in(-10)
            .not_before_in(5)
            .claim("email", json!("alice@example.com"))
            .build();

        assert_eq!(claims["aud"], json!(["a", "b"]));
        assert_eq!(claims["exp"], NOW - 10);
        assert_eq!(claims["nbf"], NOW + 5);
        assert_eq!(claims["email"], "alice@example.com");
    }

    #[test]
    fn test_without_expiry() {
        let claims = TestTokenBuilder::new("iss", "aud", NOW).without_expiry().build();
        assert!(claims.get("exp").is_none());
    }
}
