//! Metrics definitions for the token validator.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tv_` prefix for token validator
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `result`: 4 values (hit, miss, memo, store_error)
//! - `error_type`: bounded by `ValidationError::kind` (transport, format, token)
//!
//! Key IDs, issuers and claim values are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// Key Set Fetch Metrics
// ============================================================================

/// Record one key set fetch against the issuer.
///
/// Metric: `tv_jwks_fetch_total`, `tv_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("tv_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("tv_jwks_fetch_total", "status" => status).increment(1);
}

// ============================================================================
// Key Cache Metrics
// ============================================================================

/// Record how a key lookup was served.
///
/// Metric: `tv_key_cache_lookups_total`
/// Labels: `result`
pub fn record_key_lookup(result: &'static str) {
    counter!("tv_key_cache_lookups_total", "result" => result).increment(1);
}

// ============================================================================
// Validation Metrics
// ============================================================================

/// Record the outcome of one `validate` call.
///
/// Metric: `tv_token_validations_total`
/// Labels: `status`, `error_type`
pub fn record_token_validation(status: &'static str, error_type: Option<&'static str>) {
    counter!("tv_token_validations_total",
        "status" => status,
        "error_type" => error_type.unwrap_or("none")
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_record_functions_without_recorder() {
        // No recorder installed: recording must be a no-op
        record_jwks_fetch("success", Duration::from_millis(20));
        record_jwks_fetch("error", Duration::from_millis(5));
        record_key_lookup("hit");
        record_key_lookup("miss");
        record_token_validation("success", None);
        record_token_validation("error", Some("token"));
    }

    #[test]
    fn test_metrics_are_recorded_with_bounded_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_jwks_fetch("success", Duration::from_millis(20));
            record_key_lookup("hit");
            record_key_lookup("hit");
            record_token_validation("error", Some("token"));
        });

        let snapshot = snapshotter.snapshot().into_vec();

        let lookup_hits = snapshot.iter().find_map(|(key, _, _, value)| {
            let key = key.key();
            let is_hit = key.name() == "tv_key_cache_lookups_total"
                && key.labels().any(|l| l.key() == "result" && l.value() == "hit");
            match (is_hit, value) {
                (true, DebugValue::Counter(count)) => Some(*count),
                _ => None,
            }
        });
        assert_eq!(lookup_hits, Some(2));

        let names: Vec<&str> = snapshot
            .iter()
            .map(|(key, _, _, _)| key.key().name())
            .collect();
        assert!(names.contains(&"tv_jwks_fetch_total"));
        assert!(names.contains(&"tv_jwks_fetch_duration_seconds"));
        assert!(names.contains(&"tv_token_validations_total"));
    }
}
