//! Metrics and observability utilities
//!
//! Session-level counters and histograms through the `metrics` facade.
//! Nothing is exported unless the host installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

/// Metrics prefix for all Smart Explain metrics
pub const METRICS_PREFIX: &str = "smart_explain";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_sessions_total", METRICS_PREFIX),
        Unit::Count,
        "Explain sessions by terminal outcome"
    );

    describe_counter!(
        format!("{}_chunks_total", METRICS_PREFIX),
        Unit::Count,
        "Text chunks received from completion sources"
    );

    describe_histogram!(
        format!("{}_session_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Explain session latency in seconds"
    );

    describe_counter!(
        format!("{}_trigger_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Triggers refused before a session started"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to record a finished session
pub fn record_session(outcome: &str, duration: Duration, chunks: usize) {
    counter!(
        format!("{}_sessions_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    counter!(format!("{}_chunks_total", METRICS_PREFIX)).increment(chunks as u64);

    histogram!(
        format!("{}_session_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Helper to record a refused trigger
pub fn record_rejection(reason: &str) {
    counter!(
        format!("{}_trigger_rejections_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        record_session("done", Duration::from_millis(120), 3);
        record_rejection("missing_credential");
        // No recorder installed; just verify it runs without panic
    }
}
