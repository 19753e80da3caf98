//! # Token Validator Test Utilities
//!
//! Shared test utilities for the token validator.
//!
//! This crate provides:
//! - Deterministic RSA fixtures (fixed keys, JWK form, signing helpers)
//! - Claim builders (TestTokenBuilder)
//! - A mock issuer serving JWKS over HTTP (MockIssuer)
//! - Key store doubles (CountingKeyStore, FailingKeyStore)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use token_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let issuer = MockIssuer::start().await;
//!     let keypair = TestKeypair::key_a("kid1");
//!     issuer.serve_keys(&[&keypair], 1).await;
//!
//!     let claims = TestTokenBuilder::new(&issuer.issuer_url(), "my-app", now).build();
//!     let token = keypair.sign(&claims);
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_issuer;
pub mod stores;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use mock_issuer::*;
pub use stores::*;
pub use token_builders::*;
