//! Dispatch REST API client.
//!
//! Every call is one HTTP request with no retries:
//! - Local argument checks before anything goes on the wire
//! - Per-call transport timeout, widened for long polls
//! - Observability (tracing spans, metrics)

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ConnectionConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::job::JobHandle;
use crate::metrics::{outcome_label, record_empty_poll, record_job_received, record_request};
use crate::transport::{Credentials, HttpTransport, ReqwestTransport, TransportRequest};
use crate::types::{
    ClearQueueRequest, CompleteJobRequest, Operation, RequestJobOptions, RequestJobRequest,
    RequestJobResponse, StatusResponse, SubmitJobRequest, BASE_TIMEOUT_MS, MAX_LONG_POLL_SECS,
};

pub(crate) struct ClientInner {
    config: ConnectionConfig,
    transport: Arc<dyn HttpTransport>,
}

/// Client for a Dispatch job queue server.
///
/// Cheap to clone and safe to share between tasks; it holds no per-call state.
#[derive(Clone)]
pub struct DispatchClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for DispatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchClient")
            .field("config", &self.inner.config)
            .field("transport", &"<dyn HttpTransport>")
            .finish()
    }
}

impl DispatchClient {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn new(config: ConnectionConfig) -> DispatchResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create from environment variables.
    pub fn from_env() -> DispatchResult<Self> {
        Self::new(ConnectionConfig::from_env()?)
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ConnectionConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, transport }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Returns true if the server reports status `"OK"`.
    ///
    /// Any other status is `false`; transport failures are still errors.
    pub async fn status_check(&self) -> DispatchResult<bool> {
        self.execute_request(Operation::StatusCheck, None, async {
            let body = self
                .call(Operation::StatusCheck, Method::GET, None, base_timeout())
                .await?;

            let status: StatusResponse = match body {
                Value::Object(_) => serde_json::from_value(body).unwrap_or_default(),
                _ => StatusResponse::default(),
            };

            if !status.is_ok() {
                warn!(status = ?status.status, "Dispatch server did not report OK");
            }
            Ok(status.is_ok())
        })
        .await
    }

    /// Remove every pending job from a queue.
    pub async fn clear_queue(&self, queue_id: &str) -> DispatchResult<()> {
        self.execute_request(Operation::ClearQueue, Some(queue_id), async {
            require_non_empty("queueId", queue_id)?;

            let body = to_body(&ClearQueueRequest {
                queue_id: queue_id.to_string(),
            })?;
            self.call(Operation::ClearQueue, Method::POST, Some(body), base_timeout())
                .await?;
            Ok(())
        })
        .await
    }

    /// Submit a job to a queue.
    ///
    /// The server tries to hand jobs out in submission order but does not
    /// promise it.
    pub async fn submit_job<T>(&self, queue_id: &str, payload: &T) -> DispatchResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.execute_request(Operation::SubmitJob, Some(queue_id), async {
            require_non_empty("queueId", queue_id)?;

            let data = serde_json::to_value(payload).map_err(|e| {
                DispatchError::invalid_argument(format!("job payload is not valid JSON: {}", e))
            })?;
            let body = to_body(&SubmitJobRequest {
                queue_id: queue_id.to_string(),
                data,
            })?;
            self.call(Operation::SubmitJob, Method::POST, Some(body), base_timeout())
                .await?;
            Ok(())
        })
        .await
    }

    /// Ask for the next job on a queue.
    ///
    /// Returns `Ok(None)` when the queue is empty or the long poll ran out.
    pub async fn request_job(
        &self,
        queue_id: &str,
        options: RequestJobOptions,
    ) -> DispatchResult<Option<JobHandle>> {
        self.execute_request(Operation::RequestJob, Some(queue_id), async {
            require_non_empty("queueId", queue_id)?;

            if options.long_poll_secs > MAX_LONG_POLL_SECS {
                return Err(DispatchError::invalid_argument(format!(
                    "long poll seconds must be <= {}, got {}",
                    MAX_LONG_POLL_SECS, options.long_poll_secs
                )));
            }

            let job_handle_timeout = options.effective_job_handle_timeout_secs();
            if job_handle_timeout != options.job_handle_timeout_secs {
                debug!(
                    requested = options.job_handle_timeout_secs,
                    effective = job_handle_timeout,
                    "Raised job handle timeout to server minimum"
                );
            }

            let timeout = options.transport_timeout();
            debug!(
                long_poll_secs = options.long_poll_secs,
                timeout_ms = timeout.as_millis() as u64,
                "Requesting job"
            );

            let body = to_body(&RequestJobRequest {
                queue_id: queue_id.to_string(),
                job_handle_timeout_seconds: job_handle_timeout,
                timeout: options.long_poll_secs,
            })?;
            let response = self
                .call(Operation::RequestJob, Method::POST, Some(body), timeout)
                .await?;

            // Anything but an object carries no jobId, so it means no job.
            let response: RequestJobResponse = match response {
                Value::Object(_) => serde_json::from_value(response).map_err(|e| {
                    DispatchError::unexpected_response(Operation::RequestJob, e.to_string())
                })?,
                _ => RequestJobResponse::default(),
            };

            let Some(job_id) = response.job_id() else {
                record_empty_poll(queue_id);
                return Ok(None);
            };

            debug!(job_id = %job_id, "Received job");
            record_job_received(queue_id);

            Ok(Some(JobHandle::new(
                job_id.to_string(),
                queue_id.to_string(),
                response.data.unwrap_or(Value::Null),
                Arc::downgrade(&self.inner),
            )))
        })
        .await
    }

    /// Mark a job as done so the server does not hand it out again.
    pub async fn complete_job(&self, queue_id: &str, job_id: &str) -> DispatchResult<()> {
        self.execute_request(Operation::CompleteJob, Some(queue_id), async {
            require_non_empty("queueId", queue_id)?;
            require_non_empty("jobId", job_id)?;

            let body = to_body(&CompleteJobRequest {
                queue_id: queue_id.to_string(),
                job_id: job_id.to_string(),
            })?;
            self.call(Operation::CompleteJob, Method::POST, Some(body), base_timeout())
                .await?;
            Ok(())
        })
        .await
    }

    /// Complete a job previously returned by [`Self::request_job`].
    pub async fn complete_handle(&self, job: &JobHandle) -> DispatchResult<()> {
        self.complete_job(job.queue_id(), job.job_id()).await
    }

    /// Request and complete jobs until the queue reports none left.
    ///
    /// Returns the number of jobs completed. Stops at the first failure.
    pub async fn drain_queue(
        &self,
        queue_id: &str,
        options: RequestJobOptions,
    ) -> DispatchResult<usize> {
        let mut drained = 0;

        while let Some(job) = self.request_job(queue_id, options).await? {
            self.complete_handle(&job).await?;
            drained += 1;
        }

        info!(queue_id = %queue_id, drained, "Drained queue");
        Ok(drained)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Send one request and attach the operation to any failure.
    async fn call(
        &self,
        operation: Operation,
        method: Method,
        body: Option<Value>,
        timeout: Duration,
    ) -> DispatchResult<Value> {
        let config = &self.inner.config;
        let request = TransportRequest {
            method,
            url: config.url_for(operation.path()),
            credentials: Credentials {
                user: config.access_key().to_string(),
                password: config.secret_key().to_string(),
            },
            body,
            timeout,
        };

        self.inner.transport.send(request).await.map_err(|e| {
            warn!(operation = %operation, "Dispatch request failed: {}", e);
            DispatchError::operation(operation, e)
        })
    }

    async fn execute_request<T, F>(
        &self,
        operation: Operation,
        queue_id: Option<&str>,
        fut: F,
    ) -> DispatchResult<T>
    where
        F: Future<Output = DispatchResult<T>>,
    {
        let span = if let Some(queue_id) = queue_id {
            info_span!("dispatch_request", operation = operation.as_str(), queue_id = %queue_id)
        } else {
            info_span!("dispatch_request", operation = operation.as_str())
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let outcome = match &result {
            Ok(_) => outcome_label(true, false),
            Err(e) => outcome_label(false, e.is_invalid_argument()),
        };
        record_request(operation, outcome, latency_ms);

        result
    }
}

fn base_timeout() -> Duration {
    Duration::from_millis(BASE_TIMEOUT_MS)
}

fn require_non_empty(name: &str, value: &str) -> DispatchResult<()> {
    if value.is_empty() {
        return Err(DispatchError::invalid_argument(format!("Invalid {}", name)));
    }
    Ok(())
}

fn to_body<T: Serialize>(body: &T) -> DispatchResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| DispatchError::invalid_argument(format!("request body is not valid JSON: {}", e)))
}
