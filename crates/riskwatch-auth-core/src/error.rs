//! Auth core errors

use thiserror::Error;

/// Errors raised by the login primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Key or IV length does not fit the cipher
    #[error("invalid {what}: expected {expected}, got {actual} bytes")]
    InvalidKeyMaterial {
        /// Which input was rejected (`key` or `iv`)
        what: &'static str,
        /// Accepted sizes
        expected: &'static str,
        /// Supplied size
        actual: usize,
    },

    /// Token string is structurally invalid
    #[error("malformed token: {0}")]
    MalformedToken(String),
}

impl AuthError {
    /// Get error code for display and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidKeyMaterial { .. } => "INVALID_KEY_MATERIAL",
            Self::MalformedToken(_) => "MALFORMED_TOKEN",
        }
    }
}
