// crates/pipeline/src/metrics.rs
//! Stage counters. Recorded through the `metrics` facade; the server
//! installs the Prometheus recorder.

use metrics::{counter, histogram};
use std::time::Duration;

/// `outcome` is `"ok"` or `"failed"`.
pub fn record_document(outcome: &str) {
    counter!("facts_documents_total", "outcome" => outcome.to_string()).increment(1);
}

/// Wall time of one chunk: generator call plus parsing and validation.
pub fn record_chunk(duration: Duration) {
    counter!("facts_chunks_total").increment(1);
    histogram!("facts_chunk_duration_seconds").record(duration.as_secs_f64());
}

/// `outcome` is `"saved"`, `"not_pdf"` or `"failed"`.
pub fn record_download(outcome: &str) {
    counter!("facts_downloads_total", "outcome" => outcome.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_document("ok");
        record_chunk(Duration::from_millis(5));
        record_download("saved");
    }
}
