//! Login challenge types

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Login type field sent with the login request.
///
/// The appliance accepts `0` and `1`; `1` is what its own web console sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LoginType(u8);

impl LoginType {
    /// Create a login type, rejecting values other than 0 and 1
    pub fn new(value: u8) -> Result<Self, TypesError> {
        match value {
            0 | 1 => Ok(Self(value)),
            other => Err(TypesError::InvalidLoginType(other)),
        }
    }

    /// Raw wire value
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl Default for LoginType {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for LoginType {
    type Error = TypesError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LoginType> for u8 {
    fn from(value: LoginType) -> Self {
        value.0
    }
}

impl std::fmt::Display for LoginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Captcha challenge fetched ahead of a login attempt.
///
/// The correlation hash binds the image to the next login; a new fetch
/// replaces the previous challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    /// Decoded image bytes
    pub image: Vec<u8>,
    /// Correlation hash to echo in the login `Hash` header
    pub correlation_hash: String,
}

impl CaptchaChallenge {
    /// Create a new challenge
    pub fn new(image: Vec<u8>, correlation_hash: impl Into<String>) -> Self {
        Self {
            image,
            correlation_hash: correlation_hash.into(),
        }
    }
}

impl std::fmt::Debug for CaptchaChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaChallenge")
            .field("image_len", &self.image.len())
            .field("correlation_hash", &self.correlation_hash)
            .finish()
    }
}
