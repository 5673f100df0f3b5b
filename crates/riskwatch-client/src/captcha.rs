//! Captcha retrieval
//!
//! The appliance hands out a captcha image together with a correlation hash
//! that must accompany the login attempt answering it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use riskwatch_types::CaptchaChallenge;

use crate::transport::HttpTransport;
use crate::{ClientError, Result};

/// `error_code` the appliance uses for success
pub const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Deserialize)]
struct CaptchaEnvelope {
    error_code: i64,
    #[serde(default, alias = "msg")]
    message: Option<String>,
    #[serde(default)]
    data: Option<CaptchaData>,
}

#[derive(Debug, Deserialize)]
struct CaptchaData {
    base64: String,
    hash: String,
}

/// Fetches captcha challenges
#[derive(Debug, Clone)]
pub struct CaptchaClient {
    transport: HttpTransport,
}

impl CaptchaClient {
    /// Create a captcha client on a shared transport
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Fetch a fresh challenge from the appliance at `base_url`.
    #[instrument(skip(self))]
    pub async fn fetch(&self, base_url: &str) -> Result<CaptchaChallenge> {
        let url = self
            .transport
            .endpoint(base_url, self.transport.config().captcha_path())?;

        let response = self.transport.client().get(&url).send().await.map_err(|e| {
            error!(error = %e, "captcha request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "captcha endpoint returned an HTTP error");
            return Err(ClientError::protocol(
                Some(i64::from(status.as_u16())),
                format!("captcha endpoint returned HTTP {status}"),
            ));
        }

        let challenge = parse_captcha(&body)?;
        debug!(
            image_len = challenge.image.len(),
            hash = %challenge.correlation_hash,
            "captcha received"
        );
        Ok(challenge)
    }
}

fn parse_captcha(body: &str) -> Result<CaptchaChallenge> {
    let envelope: CaptchaEnvelope = serde_json::from_str(body)
        .map_err(|e| ClientError::protocol(None, format!("unparsable captcha response: {e}")))?;

    if envelope.error_code != SUCCESS_CODE {
        let message = envelope
            .message
            .unwrap_or_else(|| "captcha request rejected".to_string());
        return Err(ClientError::protocol(Some(envelope.error_code), message));
    }

    let data = envelope
        .data
        .ok_or_else(|| ClientError::protocol(Some(envelope.error_code), "captcha response has no data"))?;

    let image = STANDARD
        .decode(data.base64.trim())
        .map_err(|e| ClientError::protocol(None, format!("captcha image is not base64: {e}")))?;

    Ok(CaptchaChallenge::new(image, data.hash))
}
