//! Prometheus metrics exposition
//!
//! - `oauth_requests_total` (counter): labels `endpoint`, `outcome`
//! - `oauth_request_duration_seconds` (histogram): label `endpoint`

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("oauth_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Token endpoints only touch in-memory tables, so buckets run from 0.5ms
/// to 1s.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request. `outcome` is `ok` or the error kind.
pub fn record_request(endpoint: &'static str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "oauth_requests_total",
        "endpoint" => endpoint,
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("oauth_request_duration_seconds", "endpoint" => endpoint)
        .record(duration_secs);
}

/// Counters surfaced on /health.
#[derive(Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    /// Isolated recorder/handle pair; the global recorder can only be
    /// installed once per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_does_not_panic_without_recorder() {
        record_request("grant", "ok", 0.001);
    }

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("grant", "ok", 0.002);
        record_request("refresh", "invalid_refresh_token", 0.0004);

        let output = handle.render();
        assert!(output.contains("oauth_requests_total"));
        assert!(output.contains("endpoint=\"grant\""));
        assert!(output.contains("outcome=\"ok\""));
        assert!(output.contains("outcome=\"invalid_refresh_token\""));
        assert!(
            output.contains("oauth_request_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
        assert!(output.contains("le=\"0.0005\""));
        assert!(output.contains("le=\"+Inf\""));
    }
}
