//! Client configuration
//!
//! Every protocol constant the client depends on lives here so deployments
//! against differently configured appliances only need environment overrides.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default socket read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default captcha sub-path
pub const DEFAULT_CAPTCHA_PATH: &str = "/api/v1/login/captcha";
/// Default login sub-path
pub const DEFAULT_LOGIN_PATH: &str = "/api/v1/login";
/// Default risk list sub-path
pub const DEFAULT_RISK_LIST_PATH: &str = "/api/v1/risk/list";
/// Default `limit` sent with risk queries
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Fixed IV shared with the appliance for password encryption
pub const DEFAULT_LOGIN_IV: &str = "DbappAPTLoginSpe";
/// Default maximum window length
pub const DEFAULT_WINDOW_SPAN: Duration = Duration::from_secs(60 * 60);

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required value missing
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    /// Value present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    connect_timeout: Duration,
    read_timeout: Duration,
    captcha_path: String,
    login_path: String,
    risk_list_path: String,
    page_size: u32,
    login_iv: String,
    window_span: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            captcha_path: DEFAULT_CAPTCHA_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            risk_list_path: DEFAULT_RISK_LIST_PATH.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            login_iv: DEFAULT_LOGIN_IV.to_string(),
            window_span: DEFAULT_WINDOW_SPAN,
        }
    }
}

impl ClientConfig {
    /// Start building a configuration from the defaults
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load overrides from `RISKWATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load overrides through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "RISKWATCH_CONNECT_TIMEOUT_SECS")? {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "RISKWATCH_READ_TIMEOUT_SECS")? {
            builder = builder.read_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = lookup("RISKWATCH_CAPTCHA_PATH") {
            builder = builder.captcha_path(path);
        }
        if let Some(path) = lookup("RISKWATCH_LOGIN_PATH") {
            builder = builder.login_path(path);
        }
        if let Some(path) = lookup("RISKWATCH_RISK_LIST_PATH") {
            builder = builder.risk_list_path(path);
        }
        if let Some(size) = parse_var::<u32, _>(&lookup, "RISKWATCH_PAGE_SIZE")? {
            builder = builder.page_size(size);
        }
        if let Some(iv) = lookup("RISKWATCH_LOGIN_IV") {
            builder = builder.login_iv(iv);
        }
        if let Some(minutes) = parse_var::<u64, _>(&lookup, "RISKWATCH_WINDOW_MINUTES")? {
            builder = builder.window_span(Duration::from_secs(minutes * 60));
        }

        builder.build()
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Socket read timeout
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Captcha sub-path
    pub fn captcha_path(&self) -> &str {
        &self.captcha_path
    }

    /// Login sub-path
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Risk list sub-path
    pub fn risk_list_path(&self) -> &str {
        &self.risk_list_path
    }

    /// `limit` sent with risk queries
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// IV for password encryption
    pub fn login_iv(&self) -> &str {
        &self.login_iv
    }

    /// Maximum window length
    pub fn window_span(&self) -> Duration {
        self.window_span
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid(name)))
        .transpose()
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the captcha sub-path
    #[must_use]
    pub fn captcha_path(mut self, path: impl Into<String>) -> Self {
        self.config.captcha_path = path.into();
        self
    }

    /// Set the login sub-path
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.config.login_path = path.into();
        self
    }

    /// Set the risk list sub-path
    #[must_use]
    pub fn risk_list_path(mut self, path: impl Into<String>) -> Self {
        self.config.risk_list_path = path.into();
        self
    }

    /// Set the risk query page size
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the password encryption IV
    #[must_use]
    pub fn login_iv(mut self, iv: impl Into<String>) -> Self {
        self.config.login_iv = iv.into();
        self
    }

    /// Set the maximum window length
    #[must_use]
    pub fn window_span(mut self, span: Duration) -> Self {
        self.config.window_span = span;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let config = self.config;

        if config.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("connect_timeout"));
        }
        if config.read_timeout.is_zero() {
            return Err(ConfigError::Invalid("read_timeout"));
        }
        for (name, path) in [
            ("captcha_path", &config.captcha_path),
            ("login_path", &config.login_path),
            ("risk_list_path", &config.risk_list_path),
        ] {
            if path.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(name));
            }
        }
        if config.page_size == 0 {
            return Err(ConfigError::Invalid("page_size"));
        }
        if config.login_iv.len() != riskwatch_auth_core::IV_LENGTH {
            return Err(ConfigError::Invalid("login_iv"));
        }
        if config.window_span.is_zero() || chrono::Duration::from_std(config.window_span).is_err() {
            return Err(ConfigError::Invalid("window_span"));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.login_iv(), "DbappAPTLoginSpe");
        assert_eq!(config.window_span(), Duration::from_secs(3600));
        assert_eq!(ClientConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder()
            .captcha_path("/c")
            .login_path("/l")
            .risk_list_path("/r")
            .page_size(50)
            .window_span(Duration::from_secs(900))
            .build()
            .unwrap();
        assert_eq!(config.captcha_path(), "/c");
        assert_eq!(config.login_path(), "/l");
        assert_eq!(config.risk_list_path(), "/r");
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.window_span(), Duration::from_secs(900));
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        assert_eq!(
            ClientConfig::builder().login_iv("short").build(),
            Err(ConfigError::Invalid("login_iv"))
        );
        assert_eq!(
            ClientConfig::builder().login_path("").build(),
            Err(ConfigError::Missing("login_path"))
        );
        assert_eq!(
            ClientConfig::builder().risk_list_path("api/list").build(),
            Err(ConfigError::Invalid("risk_list_path"))
        );
        assert_eq!(
            ClientConfig::builder().page_size(0).build(),
            Err(ConfigError::Invalid("page_size"))
        );
        assert_eq!(
            ClientConfig::builder().window_span(Duration::ZERO).build(),
            Err(ConfigError::Invalid("window_span"))
        );
    }

    #[test]
    fn test_from_lookup_applies_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("RISKWATCH_CONNECT_TIMEOUT_SECS", "3"),
            ("RISKWATCH_RISK_LIST_PATH", "/api/risk"),
            ("RISKWATCH_WINDOW_MINUTES", "30"),
        ]))
        .unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.risk_list_path(), "/api/risk");
        assert_eq!(config.window_span(), Duration::from_secs(1800));
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_from_lookup_rejects_unparsable_numbers() {
        let result = ClientConfig::from_lookup(lookup_from(&[("RISKWATCH_PAGE_SIZE", "lots")]));
        assert_eq!(result, Err(ConfigError::Invalid("RISKWATCH_PAGE_SIZE")));
    }

    #[test]
    fn test_from_lookup_with_nothing_set_is_default() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
