//! Dispatch client error types.

use std::time::Duration;

use thiserror::Error;

use crate::types::Operation;

/// Result type for Dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for a single transport round trip.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures raised by the HTTP transport for one request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Errors that can occur while talking to a Dispatch server.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Rejected locally, before any request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to {operation}: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("failed to {operation}: unexpected response: {message}")]
    UnexpectedResponse {
        operation: Operation,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dispatch client was dropped before the job could be completed")]
    ClientClosed,
}

impl DispatchError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn operation(operation: Operation, source: TransportError) -> Self {
        Self::Operation { operation, source }
    }

    pub fn unexpected_response(operation: Operation, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            operation,
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DispatchError::InvalidArgument(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Operation { source, .. } if source.is_timeout())
    }

    /// The remote operation that failed, if the error came from one.
    pub fn failed_operation(&self) -> Option<Operation> {
        match self {
            DispatchError::Operation { operation, .. }
            | DispatchError::UnexpectedResponse { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// HTTP status reported by the server for a failed operation.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            DispatchError::Operation { source, .. } => source.http_status(),
            _ => None,
        }
    }
}
