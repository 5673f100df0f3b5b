//! Login password cipher
//!
//! The appliance expects the password encrypted with AES in counter mode,
//! keyed by a digest of the current wall-clock time and a fixed IV. Both
//! sides derive the key independently from the `Times` header, so the
//! cipher must be fully deterministic.
//!
//! The derivation has no clock-skew tolerance: a request that crosses a
//! minute boundary between key derivation and server-side decryption is
//! rejected by the appliance.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, TimeZone};
use ctr::cipher::{KeyIvInit, StreamCipher};
use md5::{Digest, Md5};

use crate::AuthError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Required IV length in bytes
pub const IV_LENGTH: usize = 16;

/// Pattern hashed to produce the login key (`yyyyddHH-MM-mm`)
const KEY_PATTERN: &str = "%Y%d%H-%m-%M";

/// Pattern of the `Times` login header (`yyyy-MM-dd HH:mm:ss`)
const TIMES_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Encrypt `plaintext` with AES-CTR.
///
/// The AES variant follows the key length (16, 24 or 32 bytes). The IV is
/// the initial 128-bit big-endian counter block.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
    apply_keystream(key, iv, plaintext)
}

/// Decrypt `ciphertext` produced by [`encrypt`].
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, AuthError> {
    apply_keystream(key, iv, ciphertext)
}

fn apply_keystream(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>, AuthError> {
    if iv.len() != IV_LENGTH {
        return Err(AuthError::InvalidKeyMaterial {
            what: "iv",
            expected: "16 bytes",
            actual: iv.len(),
        });
    }

    let mut buf = input.to_vec();
    match key.len() {
        16 => keystream::<Aes128Ctr>(key, iv, &mut buf)?,
        24 => keystream::<Aes192Ctr>(key, iv, &mut buf)?,
        32 => keystream::<Aes256Ctr>(key, iv, &mut buf)?,
        other => {
            return Err(AuthError::InvalidKeyMaterial {
                what: "key",
                expected: "16, 24 or 32 bytes",
                actual: other,
            })
        }
    }
    Ok(buf)
}

fn keystream<C: KeyIvInit + StreamCipher>(
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<(), AuthError> {
    let mut cipher = C::new_from_slices(key, iv).map_err(|_| AuthError::InvalidKeyMaterial {
        what: "key",
        expected: "16, 24 or 32 bytes",
        actual: key.len(),
    })?;
    cipher.apply_keystream(buf);
    Ok(())
}

/// Encrypt `text` and return standard base64.
///
/// `key` and `iv` are used as their raw UTF-8 bytes. The login key is a
/// 32-character hex digest, so its ASCII bytes (not the decoded digest)
/// become an AES-256 key. The appliance does the same.
pub fn quick_encrypt_base64(text: &str, key: &str, iv: &str) -> Result<String, AuthError> {
    let ciphertext = encrypt(key.as_bytes(), iv.as_bytes(), text.as_bytes())?;
    Ok(STANDARD.encode(ciphertext))
}

/// Key material for one login attempt, derived from a single timestamp.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginKey {
    /// Lowercase hex MD5 of the time bucket; used as cipher key bytes
    pub key: String,
    /// Value of the `Times` header the appliance derives the key from
    pub times: String,
}

impl LoginKey {
    /// Derive the key and `Times` header from `timestamp`
    pub fn derive<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            key: derive_login_key(timestamp),
            times: login_times(timestamp),
        }
    }

    /// Encrypt a password for the login body
    pub fn encrypt_password(&self, password: &str, iv: &str) -> Result<String, AuthError> {
        quick_encrypt_base64(password, &self.key, iv)
    }
}

impl std::fmt::Debug for LoginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginKey")
            .field("times", &self.times)
            .finish_non_exhaustive()
    }
}

/// Lowercase hex MD5 of `timestamp` rendered as `yyyyddHH-MM-mm`.
pub fn derive_login_key<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let bucket = timestamp.format(KEY_PATTERN).to_string();
    hex::encode(Md5::digest(bucket.as_bytes()))
}

/// `timestamp` rendered as `yyyy-MM-dd HH:mm:ss`.
pub fn login_times<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format(TIMES_PATTERN).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    const SAMPLE_KEY: &str = "e942ca56de46bd67edda30bf4c96f5e2";
    const SAMPLE_IV: &str = "DbappAPTLoginSpe";

    fn hex_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_aes128_ctr_reference_vector() {
        // NIST SP 800-38A F.5.1, first block
        let ciphertext = encrypt(
            &hex_bytes("2b7e151628aed2a6abf7158809cf4f3c"),
            &hex_bytes("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"),
            &hex_bytes("6bc1bee22e409f96e93d7e117393172a"),
        )
        .unwrap();
        assert_eq!(hex::encode(ciphertext), "874d6191b620e3261bef6864990db6ce");
    }

    #[test]
    fn test_counter_wraps_across_full_block() {
        let ciphertext = encrypt(b"0123456789abcdef", &[0xff; 16], &[b'A'; 40]).unwrap();
        assert_eq!(
            hex::encode(ciphertext),
            "70a33e3d7ad09d7032ae16fe0e287daa4ada549b0a05e1b4545c8e85815e749440f10d795b27a5a8"
        );
    }

    #[test]
    fn test_quick_encrypt_matches_appliance_sample() {
        let encrypted = quick_encrypt_base64("123123123", SAMPLE_KEY, SAMPLE_IV).unwrap();
        assert_eq!(encrypted, "7N614cMyHal6");
    }

    #[test]
    fn test_round_trip_arbitrary_length() {
        for len in [0usize, 1, 15, 16, 17, 100] {
            let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ciphertext = encrypt(SAMPLE_KEY.as_bytes(), SAMPLE_IV.as_bytes(), &plaintext).unwrap();
            assert_eq!(ciphertext.len(), len);
            let back = decrypt(SAMPLE_KEY.as_bytes(), SAMPLE_IV.as_bytes(), &ciphertext).unwrap();
            assert_eq!(back, plaintext);
        }
    }

    #[test]
    fn test_rejects_bad_iv_length() {
        let err = encrypt(&[0u8; 16], &[0u8; 12], b"x").unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidKeyMaterial {
                what: "iv",
                expected: "16 bytes",
                actual: 12,
            }
        );
        assert_eq!(err.error_code(), "INVALID_KEY_MATERIAL");
    }

    #[test]
    fn test_rejects_bad_key_length() {
        let err = quick_encrypt_base64("pw", "short", SAMPLE_IV).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidKeyMaterial {
                what: "key",
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_login_key_derivation() {
        let ts = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 15, 5, 7, 42)
            .unwrap();
        let material = LoginKey::derive(&ts);
        // md5("20241505-09-07")
        assert_eq!(material.key, "feaee69117fdd5c61df09be470730532");
        assert_eq!(material.times, "2024-09-15 05:07:42");
    }

    #[test]
    fn test_key_is_stable_within_a_minute() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let a = tz.with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap();
        let b = tz.with_ymd_and_hms(2024, 1, 2, 3, 4, 59).unwrap();
        let c = tz.with_ymd_and_hms(2024, 1, 2, 3, 5, 0).unwrap();
        assert_eq!(derive_login_key(&a), derive_login_key(&b));
        assert_ne!(derive_login_key(&a), derive_login_key(&c));
    }

    #[test]
    fn test_derived_key_is_valid_aes256_key() {
        let material = LoginKey::derive(&Utc::now());
        assert_eq!(material.key.len(), 32);
        assert!(material.encrypt_password("secret", SAMPLE_IV).is_ok());
    }

    #[test]
    fn test_debug_hides_key() {
        let material = LoginKey::derive(&Utc::now());
        assert!(!format!("{material:?}").contains(&material.key));
    }
}
