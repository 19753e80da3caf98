//! JWT shape utilities shared by token consumers.
//!
//! This module provides the parsing that happens BEFORE any cryptographic
//! work:
//! - Size limits for DoS prevention
//! - Unverified header extraction (`kid` and `alg`) for key selection
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned here is trusted: the header only selects a key, and the
//!   token MUST still be verified against that key
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::extract_header;
//!
//! let header = extract_header(token)?;
//! let jwk = key_cache.get_key(&header.kid, &issuer).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity tokens from the provider are typically 800-1500 bytes (RS256
/// signature plus profile claims). Anything larger than this is rejected
/// before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading a token header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtHeaderError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum size of {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("malformed header")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("malformed header: missing key identifier")]
    MissingKid,

    /// Token header has no usable `alg`.
    #[error("malformed header: missing algorithm")]
    MissingAlg,
}

// =============================================================================
// Header Types
// =============================================================================

/// Key identifier and algorithm read from a token without verifying it.
///
/// Transient: used only to pick the verification key and to pin the
/// algorithm before the signature is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    /// Key ID declared by the token.
    pub kid: String,

    /// Signature algorithm declared by the token.
    pub alg: String,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract `kid` and `alg` from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The `kid` value should only be used for key lookup in a trusted key set
///
/// # Errors
///
/// Returns `JwtHeaderError` variants:
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Not three segments, bad base64url, or header is not a JSON object
/// - `MissingKid` - `kid` missing, not a string, or empty
/// - `MissingAlg` - `alg` missing, not a string, or empty
pub fn extract_header(token: &str) -> Result<UnverifiedHeader, JwtHeaderError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtHeaderError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtHeaderError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtHeaderError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtHeaderError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtHeaderError::MalformedToken
    })?;

    if !header.is_object() {
        return Err(JwtHeaderError::MalformedToken);
    }

    let kid = non_empty_str(&header, "kid").ok_or(JwtHeaderError::MissingKid)?;
    let alg = non_empty_str(&header, "alg").ok_or(JwtHeaderError::MissingAlg)?;

    Ok(UnverifiedHeader { kid, alg })
}

fn non_empty_str(header: &serde_json::Value, field: &str) -> Option<String> {
    header
        .get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_extract_header_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"kid1"}"#);

        let header = extract_header(&token).unwrap();
        assert_eq!(header.kid, "kid1");
        assert_eq!(header.alg, "RS256");
    }

    #[test]
    fn test_extract_header_keeps_declared_alg() {
        // The header is reported as declared; pinning happens in the validator
        let token = token_with_header(r#"{"alg":"HS256","kid":"kid1"}"#);

        let header = extract_header(&token).unwrap();
        assert_eq!(header.alg, "HS256");
    }

    #[test]
    fn test_extract_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_extract_header_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_extract_header_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_extract_header_missing_alg() {
        let token = token_with_header(r#"{"kid":"kid1"}"#);
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MissingAlg));
    }

    #[test]
    fn test_extract_header_wrong_segment_count() {
        assert_eq!(
            extract_header("not.a.valid.jwt.format"),
            Err(JwtHeaderError::MalformedToken)
        );
        assert_eq!(extract_header("only.two"), Err(JwtHeaderError::MalformedToken));
        assert_eq!(extract_header("single"), Err(JwtHeaderError::MalformedToken));
        assert_eq!(extract_header(""), Err(JwtHeaderError::MalformedToken));
    }

    #[test]
    fn test_extract_header_invalid_base64() {
        assert_eq!(
            extract_header("!!!invalid!!!.payload.signature"),
            Err(JwtHeaderError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_header_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MalformedToken));
    }

    #[test]
    fn test_extract_header_json_array_is_malformed() {
        let token = token_with_header(r#"["kid","alg"]"#);
        assert_eq!(extract_header(&token), Err(JwtHeaderError::MalformedToken));
    }

    #[test]
    fn test_extract_header_empty_header_segment() {
        assert_eq!(
            extract_header(".payload.signature"),
            Err(JwtHeaderError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(extract_header(&oversized), Err(JwtHeaderError::TokenTooLarge));
    }

    #[test]
    fn test_extract_header_at_size_limit() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        let header = extract_header(&token).unwrap();
        assert_eq!(header.kid, "key");
    }

    #[test]
    fn test_error_messages_name_the_header() {
        assert_eq!(JwtHeaderError::MalformedToken.to_string(), "malformed header");
        assert!(JwtHeaderError::MissingKid.to_string().starts_with("malformed header"));
    }
}
