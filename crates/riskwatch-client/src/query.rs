//! Risk list queries
//!
//! One request per time window against the appliance's risk event list.
//! Only `data.total` is read from the response.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use riskwatch_types::{Credential, TimeWindow};

use crate::config::ClientConfig;
use crate::transport::{join_url, HttpTransport, JSON_CONTENT_TYPE};
use crate::{ClientError, Result};

/// Resolved risk list URL plus the bearer token to present.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    token: String,
}

impl Endpoint {
    /// Create an endpoint from parts
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    /// Resolve the endpoint for a logged-in credential.
    pub fn for_credential(credential: &Credential, config: &ClientConfig) -> Result<Self> {
        let token = credential
            .token()
            .ok_or_else(|| ClientError::validation("no session token; log in first"))?;
        let base_url = credential
            .base_url()
            .ok_or_else(|| ClientError::validation("no appliance base URL; log in first"))?;
        let url = join_url(base_url, config.risk_list_path())?;
        Ok(Self::new(url, token))
    }

    /// Full risk list URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Counts risk events in one window
#[async_trait]
pub trait RiskQuery: Send + Sync + 'static {
    /// Event total for `window`
    async fn count(&self, endpoint: &Endpoint, window: &TimeWindow) -> Result<u64>;
}

/// HTTP implementation of [`RiskQuery`]
#[derive(Debug, Clone)]
pub struct RiskListClient {
    transport: HttpTransport,
}

impl RiskListClient {
    /// Create a risk list client on a shared transport
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Transport the client sends through
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

#[async_trait]
impl RiskQuery for RiskListClient {
    #[instrument(skip(self, endpoint, window), fields(window = %window))]
    async fn count(&self, endpoint: &Endpoint, window: &TimeWindow) -> Result<u64> {
        let body = risk_list_body(window, self.transport.config().page_size());

        let response = self
            .transport
            .client()
            .post(endpoint.url())
            .header(AUTHORIZATION, format!("Bearer {}", endpoint.token()))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            warn!(status = %status, "risk list returned an HTTP error status; reading total leniently");
        }

        let total = parse_total(&raw);
        debug!(total, "window counted");
        Ok(total)
    }
}

/// Request body for one window.
///
/// Every filter is present with the neutral value the appliance's own console
/// sends; only `limit`, `begin` and `end` vary.
pub fn risk_list_body(window: &TimeWindow, limit: u32) -> Value {
    json!({
        "limit": limit,
        "offset": 0,
        "total": null,
        "queryId": null,
        "maxaccessid": null,
        "assetChildNodes": [],
        "combined": 1,
        "attackgrades": null,
        "attackstatuss": null,
        "original": null,
        "accesssubtype": [],
        "flags": null,
        "sips": [],
        "dips": [],
        "assetOrganize": null,
        "apptypeids": [],
        "eventypes": [],
        "incidentids": [],
        "pstates": [0],
        "poid": "",
        "replycode": "",
        "cve": "",
        "ruleid": "",
        "domain": "",
        "cnnvd": "",
        "pcapId": "",
        "ioctagtypes": null,
        "oobcontent": "",
        "payload": "",
        "timeAgo": "m0",
        "attackerip": "",
        "begin": window.begin_wire(),
        "end": window.end_wire(),
        "nonflags": [],
        "fromtype": null,
        "direction": null
    })
}

/// Read `data.total` from a response body.
///
/// Anything unreadable counts as zero. Integral numbers, numeric strings and
/// integral floats are accepted.
pub fn parse_total(body: &str) -> u64 {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        warn!("risk list response is not JSON; counting window as 0");
        return 0;
    };

    let total = value.get("data").and_then(|data| data.get("total"));
    match total {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => {
            warn!("risk list response has no data.total; counting window as 0");
            0
        }
    }
}
