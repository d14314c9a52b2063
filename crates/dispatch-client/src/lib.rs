//! Client for the Dispatch job queue REST API.
//!
//! This crate provides:
//! - Job submission, long-poll job requests and completion
//! - Queue clearing and server status checks
//! - Basic-auth credentials with per-client TLS verification control
//! - A pluggable HTTP transport (`reqwest` by default)

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod transport;
pub mod types;


pub use client::DispatchClient;
pub use config::{ConnectionConfig, TlsOptions};
pub use error::{DispatchError, DispatchResult, TransportError, TransportResult};
pub use job::JobHandle;
pub use transport::{Credentials, HttpTransport, ReqwestTransport, TransportRequest};
pub use types::{Operation, RequestJobOptions, DEFAULT_PORT};
