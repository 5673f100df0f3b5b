//! Riskwatch Client - SDK for the appliance web API
//!
//! Client for logging in to a security appliance and aggregating risk event
//! counts over arbitrary time ranges.
//!
//! # Example
//!
//! ```ignore
//! use riskwatch_client::{ClientConfig, HttpTransport, LoginFlow, MemorySessionStore, QueryAggregator};
//!
//! let transport = HttpTransport::new(ClientConfig::default())?;
//! let store = Arc::new(MemorySessionStore::new());
//! let flow = LoginFlow::new(transport.clone(), store.clone());
//!
//! let challenge = flow.fetch_captcha("https://10.0.0.1").await?;
//! let credential = flow.login("https://10.0.0.1", "admin", "pw", "x7k2", LoginType::default()).await?;
//!
//! let aggregator = QueryAggregator::over_http(transport);
//! let batch = aggregator.launch(&credential, start, end).await?;
//! let summary = batch.wait().await?;
//! ```

pub mod aggregator;
pub mod auth;
pub mod captcha;
pub mod config;
pub mod error;
pub mod flow;
pub mod query;
pub mod store;
pub mod transport;

pub use aggregator::{BatchCanceller, BatchHandle, QueryAggregator};
pub use auth::{AuthClient, LoginRequest, LoginResponse};
pub use captcha::CaptchaClient;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use error::ClientError;
pub use flow::LoginFlow;
pub use query::{parse_total, risk_list_body, Endpoint, RiskListClient, RiskQuery};
pub use store::{MemorySessionStore, SessionStore};
pub use transport::{join_url, HttpTransport};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
