//! Connection settings for a Dispatch server.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{DispatchError, DispatchResult};
use crate::types::DEFAULT_PORT;

/// TLS settings scoped to a single client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the server certificate. Turning this off only affects the
    /// client built from this config.
    pub verify: bool,
    /// Extra PEM root certificate to trust, e.g. for a self-signed server.
    pub ca_certificate: Option<PathBuf>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify: true,
            ca_certificate: None,
        }
    }
}

/// Endpoint, credentials and TLS settings for one Dispatch server.
///
/// Immutable once built; clients hold it behind an `Arc` and never hand out
/// mutable access.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    access_key: String,
    secret_key: String,
    tls: TlsOptions,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a config. `host` must include its scheme, e.g. `https://127.0.0.1`.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> DispatchResult<Self> {
        let host = normalize_host(host.into())?;
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.is_empty() {
            return Err(DispatchError::config("access key cannot be empty"));
        }
        if secret_key.is_empty() {
            return Err(DispatchError::config("secret key cannot be empty"));
        }

        Ok(Self {
            host,
            port,
            access_key,
            secret_key,
            tls: TlsOptions::default(),
        })
    }

    /// Create config from environment variables.
    pub fn from_env() -> DispatchResult<Self> {
        let host = std::env::var("DISPATCH_HOST")
            .map_err(|_| DispatchError::config("DISPATCH_HOST must be set"))?;

        let port = std::env::var("DISPATCH_PORT")
            .map(|s| parse_port(&s))
            .unwrap_or(DEFAULT_PORT);

        let access_key = std::env::var("DISPATCH_ACCESS_KEY")
            .map_err(|_| DispatchError::config("DISPATCH_ACCESS_KEY must be set"))?;
        let secret_key = std::env::var("DISPATCH_SECRET_KEY")
            .map_err(|_| DispatchError::config("DISPATCH_SECRET_KEY must be set"))?;

        let verify = std::env::var("DISPATCH_VERIFY_TLS")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let ca_certificate = std::env::var("DISPATCH_CA_CERT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self::new(host, port, access_key, secret_key)?.with_tls(TlsOptions {
            verify,
            ca_certificate,
        }))
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.tls.verify = verify;
        self
    }

    pub fn with_ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls.ca_certificate = Some(path.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn tls(&self) -> &TlsOptions {
        &self.tls
    }

    pub fn verify_tls(&self) -> bool {
        self.tls.verify
    }

    /// `{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full URL of an endpoint path such as `/job/submit/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}:{}{}", self.host, self.port, path)
    }
}

/// Check that `host` is a bare `http(s)://name` and strip any trailing slash.
fn normalize_host(host: String) -> DispatchResult<String> {
    let trimmed = host.trim().trim_end_matches('/').to_string();

    let parsed = Url::parse(&trimmed)
        .map_err(|e| DispatchError::config(format!("invalid host {:?}: {}", host, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DispatchError::config(format!(
            "host {:?} must use http or https",
            host
        )));
    }
    let hostname = match parsed.host_str() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(DispatchError::config(format!("host {:?} has no hostname", host))),
    };
    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(DispatchError::config(format!(
            "host {:?} must not include a path",
            host
        )));
    }
    // Url drops default ports, so compare against the bare form instead.
    let bare = format!("{}://{}", parsed.scheme(), hostname);
    if !trimmed.eq_ignore_ascii_case(&bare) {
        return Err(DispatchError::config(format!(
            "host {:?} must not include a port or credentials; pass them separately",
            host
        )));
    }

    Ok(trimmed)
}

/// Parse a port number, falling back to [`DEFAULT_PORT`] when it is not one.
pub fn parse_port(value: &str) -> u16 {
    value.trim().parse().unwrap_or(DEFAULT_PORT)
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "DISPATCH_HOST",
            "DISPATCH_PORT",
            "DISPATCH_ACCESS_KEY",
            "DISPATCH_SECRET_KEY",
            "DISPATCH_VERIFY_TLS",
            "DISPATCH_CA_CERT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_url_for_joins_host_port_and_path() {
        let config = ConnectionConfig::new("https://127.0.0.1", 6883, "test", "token").unwrap();
        assert_eq!(config.base_url(), "https://127.0.0.1:6883");
        assert_eq!(config.url_for("/job/"), "https://127.0.0.1:6883/job/");
        assert!(config.verify_tls());
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = ConnectionConfig::new("https://example.com/", 443, "a", "b").unwrap();
        assert_eq!(config.host(), "https://example.com");
    }

    #[test]
    fn test_host_without_scheme_is_rejected() {
        let err = ConnectionConfig::new("127.0.0.1", 6883, "a", "b").unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
    }

    #[test]
    fn test_host_with_port_or_path_is_rejected() {
        assert!(ConnectionConfig::new("https://example.com:6883", 6883, "a", "b").is_err());
        assert!(ConnectionConfig::new("https://example.com:443", 6883, "a", "b").is_err());
        assert!(ConnectionConfig::new("https://example.com/api", 6883, "a", "b").is_err());
        assert!(ConnectionConfig::new("ftp://example.com", 6883, "a", "b").is_err());
    }

    #[test]
    fn test_empty_credentials_are_rejected() {
        assert!(ConnectionConfig::new("https://example.com", 6883, "", "b").is_err());
        assert!(ConnectionConfig::new("https://example.com", 6883, "a", "").is_err());
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let config =
            ConnectionConfig::new("https://example.com", 6883, "access", "hunter2").unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("access"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_tls_builders() {
        let config = ConnectionConfig::new("https://example.com", 6883, "a", "b")
            .unwrap()
            .with_verify_tls(false)
            .with_ca_certificate("/etc/dispatch/ca.pem");
        assert!(!config.verify_tls());
        assert_eq!(
            config.tls().ca_certificate,
            Some(PathBuf::from("/etc/dispatch/ca.pem"))
        );
    }

    #[test]
    fn test_parse_port_falls_back_to_default() {
        assert_eq!(parse_port("7000"), 7000);
        assert_eq!(parse_port(" 7000 "), 7000);
        assert_eq!(parse_port("not-a-port"), DEFAULT_PORT);
        assert_eq!(parse_port("70000"), DEFAULT_PORT);
        assert_eq!(parse_port(""), DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_host() {
        clear_env();
        std::env::set_var("DISPATCH_ACCESS_KEY", "test");
        std::env::set_var("DISPATCH_SECRET_KEY", "token");
        assert!(ConnectionConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();
        std::env::set_var("DISPATCH_HOST", "https://127.0.0.1");
        std::env::set_var("DISPATCH_ACCESS_KEY", "test");
        std::env::set_var("DISPATCH_SECRET_KEY", "token");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(config.verify_tls());
        assert_eq!(config.tls().ca_certificate, None);
    }

    #[test]
    #[serial]
    fn test_config_from_env_parses_overrides() {
        clear_env();
        std::env::set_var("DISPATCH_HOST", "https://10.0.1.46");
        std::env::set_var("DISPATCH_PORT", "7000");
        std::env::set_var("DISPATCH_ACCESS_KEY", "access");
        std::env::set_var("DISPATCH_SECRET_KEY", "secret");
        std::env::set_var("DISPATCH_VERIFY_TLS", "false");
        std::env::set_var("DISPATCH_CA_CERT", "/tmp/ca.pem");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.port(), 7000);
        assert!(!config.verify_tls());
        assert_eq!(config.tls().ca_certificate, Some(PathBuf::from("/tmp/ca.pem")));
    }

    #[test]
    #[serial]
    fn test_config_handles_invalid_port() {
        clear_env();
        std::env::set_var("DISPATCH_HOST", "https://127.0.0.1");
        std::env::set_var("DISPATCH_PORT", "not-a-port");
        std::env::set_var("DISPATCH_ACCESS_KEY", "test");
        std::env::set_var("DISPATCH_SECRET_KEY", "token");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
    }
}
