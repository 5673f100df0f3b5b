//! Session token introspection
//!
//! Decodes `header.payload.signature` tokens for display and expiry checks.
//! Nothing here verifies the signature; the appliance remains the only
//! authority on whether a token is accepted.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::AuthError;

/// Key used to expose a segment that decoded but was not a JSON object
pub const RAW_SEGMENT_KEY: &str = "_raw";

/// `exp` values above this are read as epoch milliseconds.
///
/// A size heuristic, not part of any token standard: second-based
/// timestamps stay below it until the year 33658.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// A decoded session token
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    /// Token text without any `Bearer ` prefix
    pub raw: String,
    /// Decoded header claims
    pub header: Map<String, Value>,
    /// Decoded payload claims
    pub payload: Map<String, Value>,
    /// Third segment, verbatim (empty when absent)
    pub signature: String,
}

impl DecodedToken {
    /// Decode a token, accepting an optional case-insensitive `Bearer ` prefix.
    ///
    /// Fails only when the token has fewer than two segments or a segment is
    /// not base64url. Segments that decode to something other than a JSON
    /// object are kept under [`RAW_SEGMENT_KEY`].
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let raw = strip_bearer(token.trim()).trim();

        let mut segments: Vec<&str> = raw.split('.').collect();
        while segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        if segments.len() < 2 {
            return Err(AuthError::MalformedToken(
                "expected header.payload[.signature]".to_string(),
            ));
        }

        let header = parse_segment(&decode_segment(segments[0], "header")?);
        let payload = parse_segment(&decode_segment(segments[1], "payload")?);
        let signature = segments.get(2).map(|s| s.to_string()).unwrap_or_default();

        Ok(Self {
            raw: raw.to_string(),
            header,
            payload,
            signature,
        })
    }

    /// A payload claim rendered as a string
    pub fn claim_as_string(&self, key: &str) -> Option<String> {
        match self.payload.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Expiry instant from the `exp` claim, if present and numeric
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = match self.payload.get("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        if exp > MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(exp)
        } else {
            DateTime::from_timestamp(exp, 0)
        }
    }

    /// Whether the token expired before `now`; tokens without `exp` never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| now > exp)
    }

    /// Whether the token has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds until expiry (negative once expired)
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.expires_at()
            .map(|exp| exp.timestamp() - Utc::now().timestamp())
    }
}

impl std::fmt::Display for DecodedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Token: {}", self.raw)?;
        writeln!(f)?;
        writeln!(f, "Header:")?;
        writeln!(f, "{}", Value::Object(self.header.clone()))?;
        writeln!(f)?;
        writeln!(f, "Payload:")?;
        writeln!(f, "{}", Value::Object(self.payload.clone()))?;
        writeln!(f)?;
        writeln!(f, "Signature:")?;
        writeln!(f, "{}", self.signature)?;
        writeln!(f)?;
        match (self.expires_at(), self.remaining_seconds()) {
            (Some(exp), Some(remaining)) => {
                let local = exp.with_timezone(&chrono::Local);
                writeln!(f, "Expires at: {}", local.format("%Y-%m-%d %H:%M:%S"))?;
                writeln!(f, "Remaining seconds: {remaining}")?;
                writeln!(f, "Expired: {}", self.is_expired())
            }
            _ => writeln!(f, "No exp claim present."),
        }
    }
}

fn strip_bearer(token: &str) -> &str {
    match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => &token[7..],
        _ => token,
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<String, AuthError> {
    let mut padded = segment.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = URL_SAFE.decode(padded.as_bytes()).map_err(|e| {
        tracing::debug!(segment = name, error = %e, "token segment is not base64url");
        AuthError::MalformedToken(format!("{name} is not base64url: {e}"))
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_segment(text: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(RAW_SEGMENT_KEY.to_string(), Value::String(text.to_string()));
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    fn token_with_payload(payload: &str) -> String {
        format!("{}.{}.sig", segment(r#"{"alg":"HS256","typ":"JWT"}"#), segment(payload))
    }

    #[test]
    fn test_decodes_three_part_token() {
        let token = token_with_payload(r#"{"sub":"admin","role":1}"#);
        let decoded = DecodedToken::decode(&token).unwrap();

        assert_eq!(decoded.header["alg"], "HS256");
        assert_eq!(decoded.payload["sub"], "admin");
        assert_eq!(decoded.signature, "sig");
        assert_eq!(decoded.raw, token);
        assert_eq!(decoded.claim_as_string("role").as_deref(), Some("1"));
        assert_eq!(decoded.claim_as_string("missing"), None);
    }

    #[test]
    fn test_strips_bearer_prefix_case_insensitively() {
        let token = token_with_payload(r#"{"sub":"x"}"#);
        let decoded = DecodedToken::decode(&format!("  bEaReR {token} ")).unwrap();
        assert_eq!(decoded.raw, token);
    }

    #[test]
    fn test_two_segments_have_empty_signature() {
        let token = format!("{}.{}", segment("{}"), segment(r#"{"a":true}"#));
        let decoded = DecodedToken::decode(&token).unwrap();
        assert_eq!(decoded.signature, "");
        assert_eq!(decoded.payload["a"], true);
    }

    #[test]
    fn test_single_segment_is_malformed() {
        let err = DecodedToken::decode("abc").unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
        assert!(DecodedToken::decode("abc.").is_err());
        assert!(DecodedToken::decode("").is_err());
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let token = format!("{}.{}", segment("{}"), segment("not json at all"));
        let decoded = DecodedToken::decode(&token).unwrap();
        assert_eq!(decoded.payload[RAW_SEGMENT_KEY], "not json at all");

        let token = format!("{}.{}", segment("{}"), segment("[1,2]"));
        let decoded = DecodedToken::decode(&token).unwrap();
        assert_eq!(decoded.payload[RAW_SEGMENT_KEY], "[1,2]");
    }

    #[test]
    fn test_padded_segments_decode() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode(r#"{"k":"v"}"#);
        let token = format!("{padded}.{padded}");
        let decoded = DecodedToken::decode(&token).unwrap();
        assert_eq!(decoded.payload["k"], "v");
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let err = DecodedToken::decode("!!!!.@@@@").unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let decoded = DecodedToken::decode(&token_with_payload(r#"{"sub":"x"}"#)).unwrap();
        assert!(!decoded.is_expired());
        assert_eq!(decoded.expires_at(), None);
        assert_eq!(decoded.remaining_seconds(), None);
    }

    #[test]
    fn test_past_second_exp_is_expired() {
        let past = (Utc::now() - Duration::hours(1)).timestamp();
        let decoded =
            DecodedToken::decode(&token_with_payload(&format!(r#"{{"exp":{past}}}"#))).unwrap();
        assert!(decoded.is_expired());
        assert!(decoded.remaining_seconds().unwrap() < 0);
    }

    #[test]
    fn test_future_second_exp_is_valid() {
        let future = (Utc::now() + Duration::hours(1)).timestamp();
        let decoded =
            DecodedToken::decode(&token_with_payload(&format!(r#"{{"exp":{future}}}"#))).unwrap();
        assert!(!decoded.is_expired());
        assert!(decoded.remaining_seconds().unwrap() > 0);
    }

    #[test]
    fn test_millisecond_exp_is_detected() {
        let future_ms = (Utc::now() + Duration::hours(1)).timestamp_millis();
        let decoded =
            DecodedToken::decode(&token_with_payload(&format!(r#"{{"exp":{future_ms}}}"#)))
                .unwrap();
        assert!(!decoded.is_expired());

        let exp = decoded.expires_at().unwrap();
        assert_eq!(exp.timestamp_millis(), future_ms);
    }

    #[test]
    fn test_exp_boundary_is_strict() {
        let decoded = DecodedToken::decode(&token_with_payload(r#"{"exp":1700000000}"#)).unwrap();
        let exp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(!decoded.is_expired_at(exp));
        assert!(decoded.is_expired_at(exp + Duration::seconds(1)));
    }

    #[test]
    fn test_string_exp_is_parsed_and_garbage_ignored() {
        let decoded = DecodedToken::decode(&token_with_payload(r#"{"exp":"1700000000"}"#)).unwrap();
        assert!(decoded.is_expired());

        let decoded = DecodedToken::decode(&token_with_payload(r#"{"exp":"soon"}"#)).unwrap();
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_display_mentions_expiry_state() {
        let decoded = DecodedToken::decode(&token_with_payload(r#"{"exp":1700000000}"#)).unwrap();
        let rendered = decoded.to_string();
        assert!(rendered.contains("Header:"));
        assert!(rendered.contains("Expired: true"));

        let decoded = DecodedToken::decode(&token_with_payload("{}")).unwrap();
        assert!(decoded.to_string().contains("No exp claim present."));
    }
}
