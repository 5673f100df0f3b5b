//! Captcha-then-login flow
//!
//! Holds the most recent challenge between the captcha fetch and the login
//! that answers it. A challenge is consumed by the next login attempt
//! whatever its outcome; a new fetch replaces it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use riskwatch_types::{CaptchaChallenge, Credential, LoginType};

use crate::auth::{AuthClient, LoginRequest};
use crate::captcha::CaptchaClient;
use crate::store::SessionStore;
use crate::transport::HttpTransport;
use crate::{ClientError, Result};

#[derive(Debug)]
struct PendingChallenge {
    base_url: String,
    correlation_hash: String,
}

/// Drives captcha retrieval, login and credential persistence
pub struct LoginFlow<S: SessionStore> {
    captcha: CaptchaClient,
    auth: AuthClient,
    store: Arc<S>,
    pending: Mutex<Option<PendingChallenge>>,
}

impl<S: SessionStore> LoginFlow<S> {
    /// Create a flow on a shared transport
    pub fn new(transport: HttpTransport, store: Arc<S>) -> Self {
        Self {
            captcha: CaptchaClient::new(transport.clone()),
            auth: AuthClient::new(transport),
            store,
            pending: Mutex::new(None),
        }
    }

    /// Session store the flow writes to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch a challenge and remember it for the next login.
    pub async fn fetch_captcha(&self, base_url: &str) -> Result<CaptchaChallenge> {
        let challenge = self.captcha.fetch(base_url).await?;
        *self.pending.lock().await = Some(PendingChallenge {
            base_url: normalize(base_url),
            correlation_hash: challenge.correlation_hash.clone(),
        });
        Ok(challenge)
    }

    /// Log in answering the pending challenge, then persist the credential.
    #[instrument(skip(self, password, captcha))]
    pub async fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
        captcha: &str,
        login_type: LoginType,
    ) -> Result<Credential> {
        let request = self
            .claim_challenge(base_url, username, password, captcha, login_type)
            .await?;

        let response = self.auth.login(&request).await?;
        let token = response.token()?;

        let credential =
            Credential::new(username, password).with_session(token, request.base_url.clone());
        self.store.save(&credential).await?;

        info!(username = %username, "login succeeded");
        Ok(credential)
    }

    // Builds and validates the request against the pending challenge, and
    // only consumes the challenge once the request is fit to send.
    async fn claim_challenge(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
        captcha: &str,
        login_type: LoginType,
    ) -> Result<LoginRequest> {
        let mut pending = self.pending.lock().await;
        let correlation_hash = match pending.as_ref() {
            None => {
                return Err(ClientError::validation(
                    "no captcha has been fetched; fetch one before logging in",
                ))
            }
            Some(challenge) if challenge.base_url != normalize(base_url) => {
                return Err(ClientError::validation(format!(
                    "pending captcha belongs to {}",
                    challenge.base_url
                )))
            }
            Some(challenge) => challenge.correlation_hash.clone(),
        };

        let request = LoginRequest {
            base_url: base_url.trim().to_string(),
            username: username.to_string(),
            password: password.to_string(),
            captcha: captcha.to_string(),
            login_type,
            correlation_hash,
        };
        request.validate()?;

        pending.take();
        Ok(request)
    }
}

fn normalize(base_url: &str) -> String {
    let trimmed = base_url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::store::MemorySessionStore;

    fn flow() -> LoginFlow<MemorySessionStore> {
        let transport = HttpTransport::new(ClientConfig::default()).unwrap();
        LoginFlow::new(transport, Arc::new(MemorySessionStore::new()))
    }

    #[tokio::test]
    async fn test_login_without_captcha_is_refused() {
        let flow = flow();
        let result = flow
            .login("https://a", "admin", "pw", "x7k2", LoginType::default())
            .await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(flow.store().load().await.unwrap().is_none());
    }

    async fn seed(flow: &LoginFlow<MemorySessionStore>, base_url: &str, hash: &str) {
        *flow.pending.lock().await = Some(PendingChallenge {
            base_url: base_url.into(),
            correlation_hash: hash.into(),
        });
    }

    #[tokio::test]
    async fn test_challenge_for_other_appliance_is_kept() {
        let flow = flow();
        seed(&flow, "https://a", "h").await;

        assert!(matches!(
            flow.claim_challenge("https://b", "admin", "pw", "x7k2", LoginType::default())
                .await,
            Err(ClientError::Validation(_))
        ));
        let request = flow
            .claim_challenge("https://a/", "admin", "pw", "x7k2", LoginType::default())
            .await
            .unwrap();
        assert_eq!(request.correlation_hash, "h");
        assert_eq!(request.base_url, "https://a/");
        assert!(flow
            .claim_challenge("https://a", "admin", "pw", "x7k2", LoginType::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invalid_input_keeps_challenge() {
        let flow = flow();
        seed(&flow, "https://a", "h").await;

        let result = flow
            .login("https://a", "admin", "pw", "   ", LoginType::default())
            .await;
        assert!(matches!(result, Err(ClientError::Validation(ref m)) if m.contains("captcha")));

        let result = flow
            .login("https://a", "", "pw", "x7k2", LoginType::default())
            .await;
        assert!(matches!(result, Err(ClientError::Validation(_))));

        let pending = flow.pending.lock().await;
        assert_eq!(
            pending.as_ref().map(|c| c.correlation_hash.as_str()),
            Some("h")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" https://a/ "), "https://a");
        assert_eq!(normalize("https://a"), "https://a");
    }
}
