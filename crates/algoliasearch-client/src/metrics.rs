use std::sync::Once;

use algoliasearch_types::{AttemptOutcome, TrafficKind};
use metrics::{counter, describe_counter, describe_histogram, histogram};

static METRICS_INIT: Once = Once::new();

/// Register metric names and descriptions with the installed recorder
///
/// Safe to call more than once. Without a recorder installed the `record_*`
/// functions are no-ops.
pub fn init() {
    METRICS_INIT.call_once(|| {
        // Counter metrics
        describe_counter!(
            "algolia_host_attempts_total",
            "Total number of per-host request attempts"
        );
        describe_counter!(
            "algolia_host_failovers_total",
            "Total number of times a call moved on to the next host"
        );
        describe_counter!(
            "algolia_requests_exhausted_total",
            "Total number of calls where every candidate host failed"
        );
        describe_counter!(
            "algolia_hosts_demoted_total",
            "Total number of times a failing host was moved to the back of the order"
        );
        describe_counter!(
            "algolia_secured_keys_generated_total",
            "Total number of secured API keys generated"
        );

        // Histogram metrics
        describe_histogram!(
            "algolia_host_attempt_duration_seconds",
            "Per-host request attempt duration in seconds"
        );
    });
}

/// Record the end of one host attempt
pub fn record_attempt(kind: TrafficKind, outcome: &AttemptOutcome, duration_secs: f64) {
    counter!("algolia_host_attempts_total", "kind" => kind.as_str(), "outcome" => outcome.label())
        .increment(1);
    histogram!("algolia_host_attempt_duration_seconds", "kind" => kind.as_str())
        .record(duration_secs);
}

/// Record a move to the next host after a retryable outcome
pub fn record_failover(kind: TrafficKind, outcome: &AttemptOutcome) {
    counter!("algolia_host_failovers_total", "kind" => kind.as_str(), "reason" => outcome.label())
        .increment(1);
}

/// Record a call that ran out of hosts
pub fn record_exhausted(kind: TrafficKind) {
    counter!("algolia_requests_exhausted_total", "kind" => kind.as_str()).increment(1);
}

/// Record a host demotion
pub fn record_host_demoted() {
    counter!("algolia_hosts_demoted_total").increment(1);
}

/// Record a secured API key generation
pub fn record_secured_key(with_user_token: bool) {
    counter!("algolia_secured_keys_generated_total", "user_token" => with_user_token.to_string())
        .increment(1);
}
