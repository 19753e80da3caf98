//! Token validation error types.
//!
//! Three kinds reach the caller of `TokenValidator::validate`:
//! - `Transport`: the key set could not be fetched (network, non-2xx)
//! - `Format`: the key set response was not a usable JWKS document
//! - `Token`: anything wrong with the token itself
//!
//! Callers are expected to reject the request on any `Token` error without
//! branching on the reason. The reason string is kept for diagnostics.

use common::jwt::JwtHeaderError;
use thiserror::Error;

/// Token validation error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Key set fetch failed: {0}")]
    Transport(String),

    #[error("Key set response malformed: {0}")]
    Format(String),

    #[error("Invalid token: {reason}")]
    Token { reason: String },
}

impl ValidationError {
    /// Build a `Token` error with a human-readable reason.
    pub fn token(reason: impl Into<String>) -> Self {
        ValidationError::Token {
            reason: reason.into(),
        }
    }

    /// True for token-side failures (reject the caller), false for issuer-side ones.
    pub fn is_token_error(&self) -> bool {
        matches!(self, ValidationError::Token { .. })
    }

    /// The distinguishing text carried by this error.
    pub fn reason(&self) -> &str {
        match self {
            ValidationError::Transport(reason)
            | ValidationError::Format(reason)
            | ValidationError::Token { reason } => reason,
        }
    }

    /// Bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Transport(_) => "transport",
            ValidationError::Format(_) => "format",
            ValidationError::Token { .. } => "token",
        }
    }
}

impl From<JwtHeaderError> for ValidationError {
    fn from(err: JwtHeaderError) -> Self {
        ValidationError::token(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let reason = match err.kind() {
            ErrorKind::InvalidSignature => "Signature verification failed".to_string(),
            ErrorKind::InvalidAudience => "Invalid audience".to_string(),
            ErrorKind::InvalidIssuer => "Invalid issuer".to_string(),
            ErrorKind::ExpiredSignature => "Signature has expired".to_string(),
            ErrorKind::ImmatureSignature => "The token is not yet valid (nbf)".to_string(),
            ErrorKind::InvalidAlgorithm => "The specified alg value is not allowed".to_string(),
            ErrorKind::MissingRequiredClaim(claim) => {
                format!("Token is missing the \"{claim}\" claim")
            }
            ErrorKind::InvalidRsaKey(detail) => format!("malformed key material: {detail}"),
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => "Invalid token structure".to_string(),
            other => format!("Token verification failed: {other:?}"),
        };

        ValidationError::Token { reason }
    }
}
