//! Dispatch wire types and protocol constants.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Protocol constants
// =============================================================================

/// Port the Dispatch server listens on by default.
pub const DEFAULT_PORT: u16 = 6883;

/// Transport timeout for every call, before any long-poll wait is added.
pub const BASE_TIMEOUT_MS: u64 = 12_000;

/// Server-side floor for the visibility timeout of a dequeued job.
pub const MIN_JOB_HANDLE_TIMEOUT_SECS: u64 = 40;

/// Default visibility timeout; raised to [`MIN_JOB_HANDLE_TIMEOUT_SECS`] when sent.
pub const DEFAULT_JOB_HANDLE_TIMEOUT_SECS: u64 = 20;

/// Longest wait the server accepts for a long poll.
pub const MAX_LONG_POLL_SECS: i64 = 20;

/// Negative means "answer immediately".
pub const DEFAULT_LONG_POLL_SECS: i64 = -1;

// =============================================================================
// Operations
// =============================================================================

/// The remote calls exposed by a Dispatch server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StatusCheck,
    ClearQueue,
    SubmitJob,
    RequestJob,
    CompleteJob,
}

impl Operation {
    /// Path of the endpoint, relative to `{host}:{port}`.
    pub const fn path(self) -> &'static str {
        match self {
            Self::StatusCheck => "/job/",
            Self::ClearQueue => "/job/clear",
            Self::SubmitJob => "/job/submit/",
            Self::RequestJob => "/job/request/",
            Self::CompleteJob => "/job/complete/",
        }
    }

    /// Stable label used for spans and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusCheck => "status_check",
            Self::ClearQueue => "clear_queue",
            Self::SubmitJob => "submit_job",
            Self::RequestJob => "request_job",
            Self::CompleteJob => "complete_job",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StatusCheck => "check status",
            Self::ClearQueue => "clear queue",
            Self::SubmitJob => "submit job",
            Self::RequestJob => "request job",
            Self::CompleteJob => "complete job",
        })
    }
}

// =============================================================================
// Request options
// =============================================================================

/// Tuning for a single job request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestJobOptions {
    /// Seconds the server reserves the job for this caller before redelivering
    /// it. Raised to [`MIN_JOB_HANDLE_TIMEOUT_SECS`] when sent.
    pub job_handle_timeout_secs: u64,
    /// Seconds the server may hold the request open waiting for a job.
    /// Negative disables long polling; more than [`MAX_LONG_POLL_SECS`] is rejected.
    pub long_poll_secs: i64,
}

impl Default for RequestJobOptions {
    fn default() -> Self {
        Self {
            job_handle_timeout_secs: DEFAULT_JOB_HANDLE_TIMEOUT_SECS,
            long_poll_secs: DEFAULT_LONG_POLL_SECS,
        }
    }
}

impl RequestJobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_handle_timeout(mut self, secs: u64) -> Self {
        self.job_handle_timeout_secs = secs;
        self
    }

    pub fn long_poll(mut self, secs: i64) -> Self {
        self.long_poll_secs = secs;
        self
    }

    /// Visibility timeout actually sent on the wire.
    pub fn effective_job_handle_timeout_secs(&self) -> u64 {
        self.job_handle_timeout_secs.max(MIN_JOB_HANDLE_TIMEOUT_SECS)
    }

    /// Transport timeout: the base slack plus the server's long-poll window.
    ///
    /// The window never counts for more than [`MAX_LONG_POLL_SECS`].
    pub fn transport_timeout(&self) -> Duration {
        let wait_secs = self.long_poll_secs.clamp(0, MAX_LONG_POLL_SECS) as u64;
        Duration::from_millis(BASE_TIMEOUT_MS + wait_secs * 1000)
    }
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearQueueRequest {
    pub queue_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub queue_id: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestJobRequest {
    pub queue_id: String,
    pub job_handle_timeout_seconds: u64,
    /// Long-poll wait in seconds; unrelated to the transport timeout.
    pub timeout: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteJobRequest {
    pub queue_id: String,
    pub job_id: String,
}

// =============================================================================
// Response bodies
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("OK")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestJobResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RequestJobResponse {
    /// The job id, if the server actually handed out a job.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_options_defaults() {
        let options = RequestJobOptions::default();
        assert_eq!(options.job_handle_timeout_secs, 20);
        assert_eq!(options.long_poll_secs, -1);
        assert_eq!(options.effective_job_handle_timeout_secs(), 40);
        assert_eq!(options.transport_timeout(), Duration::from_millis(12_000));
    }

    #[test]
    fn test_job_handle_timeout_is_clamped_to_floor() {
        for secs in [0, 1, 20, 39, 40] {
            let options = RequestJobOptions::new().job_handle_timeout(secs);
            assert_eq!(options.effective_job_handle_timeout_secs(), 40);
        }
        let options = RequestJobOptions::new().job_handle_timeout(90);
        assert_eq!(options.effective_job_handle_timeout_secs(), 90);
    }

    #[test]
    fn test_transport_timeout_adds_long_poll_window() {
        for secs in [-30, -1, 0] {
            let options = RequestJobOptions::new().long_poll(secs);
            assert_eq!(options.transport_timeout(), Duration::from_millis(12_000));
        }
        let options = RequestJobOptions::new().long_poll(5);
        assert_eq!(options.transport_timeout(), Duration::from_millis(17_000));
        let options = RequestJobOptions::new().long_poll(20);
        assert_eq!(options.transport_timeout(), Duration::from_millis(32_000));
    }

    #[test]
    fn test_transport_timeout_caps_oversized_long_poll() {
        for secs in [21, 3_600, i64::MAX] {
            let options = RequestJobOptions::new().long_poll(secs);
            assert_eq!(options.transport_timeout(), Duration::from_millis(32_000));
        }
        let options = RequestJobOptions::new().long_poll(i64::MIN);
        assert_eq!(options.transport_timeout(), Duration::from_millis(12_000));
    }

    #[test]
    fn test_request_job_body_uses_wire_names() {
        let body = RequestJobRequest {
            queue_id: "EXAMPLE".into(),
            job_handle_timeout_seconds: 40,
            timeout: -1,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"queueId": "EXAMPLE", "jobHandleTimeoutSeconds": 40, "timeout": -1})
        );
    }

    #[test]
    fn test_request_job_response_treats_empty_id_as_no_job() {
        let empty: RequestJobResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.job_id(), None);

        let blank: RequestJobResponse =
            serde_json::from_value(json!({"jobId": "", "data": null})).unwrap();
        assert_eq!(blank.job_id(), None);

        let null: RequestJobResponse = serde_json::from_value(json!({"jobId": null})).unwrap();
        assert_eq!(null.job_id(), None);

        let job: RequestJobResponse =
            serde_json::from_value(json!({"jobId": "abc", "data": {"x": 1}})).unwrap();
        assert_eq!(job.job_id(), Some("abc"));
    }

    #[test]
    fn test_status_response_requires_literal_ok() {
        let ok: StatusResponse = serde_json::from_value(json!({"status": "OK"})).unwrap();
        assert!(ok.is_ok());
        let pending: StatusResponse =
            serde_json::from_value(json!({"status": "PENDING"})).unwrap();
        assert!(!pending.is_ok());
        let missing: StatusResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!missing.is_ok());
    }

    #[test]
    fn test_operation_paths() {
        assert_eq!(Operation::StatusCheck.path(), "/job/");
        assert_eq!(Operation::ClearQueue.path(), "/job/clear");
        assert_eq!(Operation::SubmitJob.path(), "/job/submit/");
        assert_eq!(Operation::RequestJob.path(), "/job/request/");
        assert_eq!(Operation::CompleteJob.path(), "/job/complete/");
        assert_eq!(Operation::ClearQueue.to_string(), "clear queue");
    }
}
