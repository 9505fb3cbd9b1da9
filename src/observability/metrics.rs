//! Metrics collection.
//!
//! # Metrics
//! - `discovery_resolvers_created_total` (counter): resolvers created, by scheme
//! - `discovery_results_total` (counter): results published, by scheme and outcome
//! - `discovery_resolution_wait_seconds` (histogram): time requests spent waiting for an address
//! - `discovery_requests_rewritten_total` (counter): requests forwarded to the transport, by scheme
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; installing an exporter is left to the embedding process
//! - Without an installed recorder every call is a no-op

use std::time::Instant;

/// Record creation of a resolver for `scheme`.
pub fn record_resolver_created(scheme: &str) {
    metrics::counter!("discovery_resolvers_created_total", "scheme" => scheme.to_string()).increment(1);
}

/// Record a result published by a resolver. `outcome` is one of
/// `success`, `empty`, `failure`.
pub fn record_result(scheme: &str, outcome: &'static str) {
    metrics::counter!(
        "discovery_results_total",
        "scheme" => scheme.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long a request waited on its scheme's address.
pub fn record_wait(scheme: &str, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics::histogram!("discovery_resolution_wait_seconds", "scheme" => scheme.to_string()).record(duration);
}

/// Record a request rewritten and handed to the transport.
pub fn record_rewrite(scheme: &str) {
    metrics::counter!("discovery_requests_rewritten_total", "scheme" => scheme.to_string()).increment(1);
}
