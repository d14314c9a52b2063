//! Dispatch client metrics.
//!
//! - Request counters by operation and outcome
//! - Latency histograms
//! - Job delivery counters for long polling

use metrics::{counter, histogram};

use crate::types::Operation;

/// Metric name constants for consistency.
pub mod names {
    /// Total Dispatch requests by operation and outcome.
    pub const REQUESTS_TOTAL: &str = "dispatch_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "dispatch_request_latency_seconds";

    /// Jobs handed out by the server, by queue.
    pub const JOBS_RECEIVED_TOTAL: &str = "dispatch_jobs_received_total";

    /// Job requests that came back without a job, by queue.
    pub const EMPTY_POLLS_TOTAL: &str = "dispatch_empty_polls_total";
}

/// Outcome label for a finished request.
pub fn outcome_label(success: bool, invalid_argument: bool) -> &'static str {
    match (success, invalid_argument) {
        (true, _) => "ok",
        (false, true) => "invalid_argument",
        (false, false) => "error",
    }
}

/// Record metrics for a completed request.
pub fn record_request(operation: Operation, outcome: &'static str, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.as_str()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_job_received(queue_id: &str) {
    counter!(names::JOBS_RECEIVED_TOTAL, "queue_id" => queue_id.to_string()).increment(1);
}

pub fn record_empty_poll(queue_id: &str) {
    counter!(names::EMPTY_POLLS_TOTAL, "queue_id" => queue_id.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("dispatch_"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
        assert!(names::JOBS_RECEIVED_TOTAL.contains("jobs"));
        assert!(names::EMPTY_POLLS_TOTAL.contains("empty"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(true, false), "ok");
        assert_eq!(outcome_label(false, true), "invalid_argument");
        assert_eq!(outcome_label(false, false), "error");
    }
}
