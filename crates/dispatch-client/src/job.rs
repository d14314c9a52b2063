//! Jobs handed out by a Dispatch server.

use std::fmt;
use std::sync::Weak;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{ClientInner, DispatchClient};
use crate::error::{DispatchError, DispatchResult};

/// A job received from [`DispatchClient::request_job`].
///
/// Holds a weak link back to the client that fetched it so it can complete
/// itself; the handle does not keep the client alive. Completing twice sends
/// two requests, the server decides what the second one means.
#[derive(Clone)]
pub struct JobHandle {
    job_id: String,
    queue_id: String,
    payload: Value,
    client: Weak<ClientInner>,
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("queue_id", &self.queue_id)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl JobHandle {
    pub(crate) fn new(
        job_id: String,
        queue_id: String,
        payload: Value,
        client: Weak<ClientInner>,
    ) -> Self {
        Self {
            job_id,
            queue_id,
            payload,
            client,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    /// Raw payload as submitted; `null` if the server sent none.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> DispatchResult<T> {
        T::deserialize(&self.payload).map_err(|e| {
            DispatchError::invalid_argument(format!(
                "payload of job {} does not match the requested type: {}",
                self.job_id, e
            ))
        })
    }

    /// Tell the server this job is done.
    pub async fn complete(&self) -> DispatchResult<()> {
        let inner = self.client.upgrade().ok_or(DispatchError::ClientClosed)?;
        DispatchClient::from_inner(inner)
            .complete_job(&self.queue_id, &self.job_id)
            .await
    }
}
