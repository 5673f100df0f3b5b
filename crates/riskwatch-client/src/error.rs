//! Client errors
//!
//! Error types for appliance operations, with mappings from transport and
//! protocol-layer failures.

use riskwatch_auth_core::AuthError;
use riskwatch_types::TypesError;
use thiserror::Error;

use crate::config::ConfigError;

/// Client errors for appliance operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network, TLS or timeout failure before a response was read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The appliance answered, but not in the expected shape.
    #[error("protocol error: {message}")]
    Protocol {
        /// Status or `error_code` reported by the appliance, when known
        code: Option<i64>,
        /// Error message
        message: String,
    },

    /// Session token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Caller input or local state rejected before any request.
    #[error("validation error: {0}")]
    Validation(String),

    /// Cipher key or IV has an unusable length.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Request body could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Session store failed to load or persist a credential.
    #[error("session store error: {0}")]
    Store(String),

    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal client failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Protocol error with an optional appliance code.
    pub fn protocol(code: Option<i64>, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if the failure happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Get error code for display and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Protocol { .. } => "PROTOCOL",
            Self::MalformedToken(_) => "MALFORMED_TOKEN",
            Self::Validation(_) => "VALIDATION",
            Self::InvalidKeyMaterial(_) => "INVALID_KEY_MATERIAL",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Store(_) => "STORE",
            Self::Config(_) => "CONFIG",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidKeyMaterial { .. } => Self::InvalidKeyMaterial(err.to_string()),
            AuthError::MalformedToken(message) => Self::MalformedToken(message),
        }
    }
}

impl From<TypesError> for ClientError {
    fn from(err: TypesError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
