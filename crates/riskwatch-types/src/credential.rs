//! Stored credential

use serde::{Deserialize, Serialize};

/// Account credential persisted between sessions.
///
/// Replaced as a whole after each successful login; fields are never
/// patched individually. Serialized with the field names of the account
/// file (`username`, `password`, `jwtToken`, `loginUrl`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Account name
    pub username: String,
    /// Account password as entered by the user
    pub password: String,
    /// Session token returned by the last login
    #[serde(rename = "jwtToken", default)]
    pub session_token: Option<String>,
    /// Appliance base URL the token belongs to
    #[serde(rename = "loginUrl", default)]
    pub endpoint_base_url: Option<String>,
}

impl Credential {
    /// Create a credential without a session
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            session_token: None,
            endpoint_base_url: None,
        }
    }

    /// Attach the session token and endpoint of a successful login
    #[must_use]
    pub fn with_session(mut self, token: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self.endpoint_base_url = Some(base_url.into());
        self
    }

    /// Session token, if one is present and non-empty
    pub fn token(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Endpoint base URL, if one is present and non-empty
    pub fn base_url(&self) -> Option<&str> {
        self.endpoint_base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("has_token", &self.session_token.is_some())
            .field("endpoint_base_url", &self.endpoint_base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_session() {
        let cred = Credential::new("admin", "s3cret").with_session("a.b.c", "https://10.0.0.1");
        let json = serde_json::to_string(&cred).unwrap();
        assert!(json.contains("\"jwtToken\":\"a.b.c\""));
        assert!(json.contains("\"loginUrl\":\"https://10.0.0.1\""));

        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn test_round_trip_without_token() {
        let cred = Credential::new("admin", "s3cret");
        let json = serde_json::to_string(&cred).unwrap();
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
        assert!(back.token().is_none());
        assert!(back.base_url().is_none());
    }

    #[test]
    fn test_missing_fields_load_as_absent() {
        let back: Credential =
            serde_json::from_str(r#"{"username":"u","password":"p"}"#).unwrap();
        assert_eq!(back.session_token, None);
        assert_eq!(back.endpoint_base_url, None);
    }

    #[test]
    fn test_blank_values_are_treated_as_missing() {
        let cred = Credential::new("u", "p").with_session("  ", " ");
        assert!(cred.token().is_none());
        assert!(cred.base_url().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::new("admin", "hunter2").with_session("tok.en", "https://x");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok.en"));
    }
}
