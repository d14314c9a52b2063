//! HTTP transport used by [`DispatchClient`](crate::DispatchClient).
//!
//! The client only shapes requests and interprets responses; the round trip
//! itself goes through [`HttpTransport`] so it can be swapped in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{DispatchError, DispatchResult, TransportError, TransportResult};

/// Basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub credentials: Credentials,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Performs a single HTTP round trip and returns the parsed JSON body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> TransportResult<Value>;
}

/// [`HttpTransport`] backed by a `reqwest` client built for one connection.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the TLS settings of `config`.
    ///
    /// Certificate checks are relaxed on this client only.
    pub fn new(config: &ConnectionConfig) -> DispatchResult<Self> {
        let tls = config.tls();

        let mut builder = Client::builder()
            .user_agent(concat!("dispatch-client/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!tls.verify);

        if let Some(path) = &tls.ca_certificate {
            let pem = std::fs::read(path).map_err(|e| {
                DispatchError::config(format!(
                    "failed to read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                DispatchError::config(format!(
                    "invalid CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let http = builder
            .build()
            .map_err(|e| DispatchError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Wrap an already configured `reqwest` client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> TransportResult<Value> {
        let TransportRequest {
            method,
            url,
            credentials,
            body,
            timeout,
        } = request;

        debug!(%method, %url, timeout_ms = timeout.as_millis() as u64, "Sending Dispatch request");

        let mut builder = self
            .http
            .request(method, &url)
            .basic_auth(&credentials.user, Some(&credentials.password))
            .header(header::ACCEPT, "application/json")
            .timeout(timeout);

        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_send_error(e, timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, timeout))?;

        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), text));
        }

        parse_body(&text)
    }
}

fn map_send_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(error)
    }
}

/// Empty bodies are valid for calls whose response is ignored.
fn parse_body(text: &str) -> TransportResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_empty_is_null() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert_eq!(parse_body("  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_body_json() {
        assert_eq!(parse_body(r#"{"status":"OK"}"#).unwrap(), json!({"status": "OK"}));
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        assert!(matches!(
            parse_body("<html>oops</html>"),
            Err(TransportError::Json(_))
        ));
    }

    #[test]
    fn test_transport_builds_without_verification() {
        let config = ConnectionConfig::new("https://127.0.0.1", 6883, "test", "token")
            .unwrap()
            .with_verify_tls(false);
        tokio_test::assert_ok!(ReqwestTransport::new(&config));
    }

    #[test]
    fn test_transport_reports_missing_ca_certificate() {
        let config = ConnectionConfig::new("https://127.0.0.1", 6883, "test", "token")
            .unwrap()
            .with_ca_certificate("/nonexistent/dispatch-ca.pem");
        let err = ReqwestTransport::new(&config).unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials {
            user: "test".into(),
            password: "token".into(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("test"));
        assert!(!debug.contains("token"));
    }
}
