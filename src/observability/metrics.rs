//! Metrics collection.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatched requests by outcome
//! - `dispatch_duration_seconds` (histogram): pipeline latency by outcome
//! - `route_cache_entries` (gauge): size of the direct-match route cache
//! - `route_not_found_total` (counter): unresolved request paths
//! - `dispatch_failures_total` (counter): failures by kind and recovery
//!
//! # Design Decisions
//! - Thin helpers over the `metrics` macros so call sites stay one line
//! - Labels are low-cardinality: outcomes and kinds, never raw paths

use std::time::Instant;

/// Record a completed dispatch.
pub fn record_dispatch(outcome: &'static str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    metrics::counter!("dispatch_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("dispatch_duration_seconds", "outcome" => outcome).record(elapsed);
}

/// Record the current number of cached direct-match routes.
pub fn record_route_cache_size(size: usize) {
    metrics::gauge!("route_cache_entries").set(size as f64);
}

pub fn record_route_not_found() {
    metrics::counter!("route_not_found_total").increment(1);
}

/// Record a failure that reached recovery.
pub fn record_failure(kind: &str, recovered: bool) {
    metrics::counter!(
        "dispatch_failures_total",
        "kind" => kind.to_string(),
        "recovered" => if recovered { "true" } else { "false" }
    )
    .increment(1);
}
