//! Login
//!
//! Submits the captcha answer and the time-keyed encrypted password. The
//! appliance derives the same key from the `Times` header, so the key and
//! header must come from one timestamp.

use chrono::Local;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use riskwatch_auth_core::LoginKey;
use riskwatch_types::LoginType;

use crate::transport::{HttpTransport, JSON_CONTENT_TYPE};
use crate::{ClientError, Result};

/// Everything needed for one login attempt.
#[derive(Clone)]
pub struct LoginRequest {
    /// Appliance base URL, also sent as `Origin`
    pub base_url: String,
    /// Account name
    pub username: String,
    /// Plaintext password; encrypted before it leaves the process
    pub password: String,
    /// Captcha answer typed by the operator
    pub captcha: String,
    /// Login type field
    pub login_type: LoginType,
    /// Correlation hash from the captcha being answered
    pub correlation_hash: String,
}

impl LoginRequest {
    /// Reject requests that would certainly fail at the appliance.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("base URL", &self.base_url),
            ("username", &self.username),
            ("password", &self.password),
            ("captcha", &self.captcha),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ClientError::validation(format!("{name} is required")));
            }
        }
        if self.correlation_hash.trim().is_empty() {
            return Err(ClientError::validation(
                "no captcha has been fetched for this login",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("captcha", &self.captcha)
            .field("login_type", &self.login_type)
            .field("correlation_hash", &self.correlation_hash)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
    captcha: &'a str,
    #[serde(rename = "loginType")]
    login_type: u8,
}

/// Raw login response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    raw: String,
}

impl LoginResponse {
    /// Wrap a response body
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Body exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Extract the session token from the body's top-level `token` field.
    pub fn token(&self) -> Result<String> {
        let value: Value = serde_json::from_str(&self.raw)
            .map_err(|e| ClientError::protocol(None, format!("unparsable login response: {e}")))?;

        match value.get("token").and_then(Value::as_str).map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => {
                let code = value.get("error_code").and_then(Value::as_i64);
                let message = value
                    .get("message")
                    .or_else(|| value.get("msg"))
                    .and_then(Value::as_str)
                    .unwrap_or("login response carries no token");
                Err(ClientError::protocol(code, message))
            }
        }
    }
}

/// Performs login requests
#[derive(Debug, Clone)]
pub struct AuthClient {
    transport: HttpTransport,
}

impl AuthClient {
    /// Create an auth client on a shared transport
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Log in with key material derived from the local clock.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let key = LoginKey::derive(&Local::now());
        self.login_with_key(request, &key).await
    }

    /// Log in with explicit key material.
    #[instrument(skip(self, key), fields(base_url = %request.base_url, username = %request.username))]
    pub async fn login_with_key(&self, request: &LoginRequest, key: &LoginKey) -> Result<LoginResponse> {
        request.validate()?;

        let url = self
            .transport
            .endpoint(&request.base_url, self.transport.config().login_path())?;
        let password = key.encrypt_password(&request.password, self.transport.config().login_iv())?;

        let body = LoginBody {
            username: &request.username,
            password: &password,
            captcha: &request.captcha,
            login_type: request.login_type.as_u8(),
        };

        debug!(times = %key.times, "submitting login");

        let response = self
            .transport
            .client()
            .post(&url)
            .header("Authorization", "Bearer")
            .header("Encrypt", "true")
            .header("Hash", request.correlation_hash.as_str())
            .header("Times", key.times.as_str())
            .header("User-Type", "undefined")
            .header("Origin", request.base_url.as_str())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "login request failed");
                ClientError::from(e)
            })?;

        let status = response.status();
        let raw = response.text().await?;
        if raw.is_empty() {
            return Err(ClientError::protocol(
                Some(i64::from(status.as_u16())),
                "login response body is empty",
            ));
        }
        if !status.is_success() {
            warn!(status = %status, "login endpoint returned an HTTP error status with a body");
        }

        Ok(LoginResponse::new(raw))
    }
}
