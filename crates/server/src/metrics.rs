// crates/server/src/metrics.rs
//! Prometheus recorder setup and request/job counters.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

use facts_jobs::JobKind;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Returns `false` if it was already
/// installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("facts_requests_total", "API requests by endpoint and status");
    describe_histogram!("facts_request_duration_seconds", "API request duration in seconds");
    describe_counter!("facts_jobs_launched_total", "Jobs launched by kind");
    describe_counter!("facts_documents_total", "Documents processed by outcome");
    describe_counter!("facts_chunks_total", "Chunks sent to the generator");
    describe_histogram!("facts_chunk_duration_seconds", "Per-chunk generation and validation time");
    describe_counter!("facts_downloads_total", "Paper downloads by outcome");
}

/// Render current metrics in Prometheus text format, `None` before
/// [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_request(endpoint: &str, status: u16, duration: Duration) {
    counter!("facts_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("facts_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_job_launch(kind: JobKind) {
    counter!("facts_jobs_launched_total", "kind" => kind.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_before_init_is_noop() {
        record_request("health", 200, Duration::from_millis(1));
        record_job_launch(JobKind::Download);
        let _ = render_metrics();
    }
}
