//! Observability for the token validator.
//!
//! The library only records through the `metrics` facade; installing an
//! exporter is left to the embedding service.

pub mod metrics;
