//! HTTP transport
//!
//! One shared `reqwest` client per process, configured for appliances that
//! present self-signed certificates.

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::{ClientError, Result};

/// `Content-Type` the appliance expects on JSON requests
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Shared HTTP client plus the configuration it was built from.
///
/// Certificate validation is disabled: appliances on isolated networks ship
/// self-signed certificates that cannot be pinned ahead of time. Only use
/// this against hosts reached over a network you already trust.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Build the transport from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        warn!("TLS certificate validation is disabled for appliance connections");

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()
            .map_err(|e| ClientError::Internal(format!("failed to build HTTP client: {e}")))?;

        debug!(
            connect_timeout = ?config.connect_timeout(),
            read_timeout = ?config.read_timeout(),
            "HTTP transport ready"
        );

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Configuration the transport was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve `path` against an appliance base URL.
    pub fn endpoint(&self, base_url: &str, path: &str) -> Result<String> {
        join_url(base_url, path)
    }
}

/// Join a base URL and a sub-path, dropping one trailing `/` from the base.
pub fn join_url(base_url: &str, path: &str) -> Result<String> {
    let base = base_url.trim();
    if base.is_empty() {
        return Err(ClientError::validation("base URL is required"));
    }

    let base = base.strip_suffix('/').unwrap_or(base);
    let joined = format!("{base}{path}");

    let parsed = reqwest::Url::parse(&joined)
        .map_err(|e| ClientError::validation(format!("invalid base URL {base_url:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::validation(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_strips_one_trailing_slash() {
        assert_eq!(
            join_url("https://10.0.0.1/", "/api/v1/login").unwrap(),
            "https://10.0.0.1/api/v1/login"
        );
        assert_eq!(
            join_url("https://10.0.0.1", "/api/v1/login").unwrap(),
            "https://10.0.0.1/api/v1/login"
        );
        assert_eq!(
            join_url("https://10.0.0.1:8443/", "/x").unwrap(),
            "https://10.0.0.1:8443/x"
        );
    }

    #[test]
    fn test_join_url_rejects_bad_bases() {
        assert!(matches!(join_url("", "/x"), Err(ClientError::Validation(_))));
        assert!(matches!(join_url("   ", "/x"), Err(ClientError::Validation(_))));
        assert!(matches!(join_url("not a url", "/x"), Err(ClientError::Validation(_))));
        assert!(matches!(join_url("ftp://host", "/x"), Err(ClientError::Validation(_))));
    }

    #[test]
    fn test_transport_builds_from_default_config() {
        let transport = HttpTransport::new(ClientConfig::default()).unwrap();
        assert_eq!(transport.config().page_size(), 20);
        assert_eq!(
            transport.endpoint("http://appliance/", transport.config().login_path()).unwrap(),
            "http://appliance/api/v1/login"
        );
    }
}
