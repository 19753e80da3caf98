//! Common utilities shared across Pool Guard crates.

#![warn(clippy::pedantic)]

/// Module for JWT shape utilities (size limit, unverified header)
pub mod jwt;

/// Module for the verification clock
pub mod clock;
