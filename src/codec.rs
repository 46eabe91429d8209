//! Authenticated, encrypted cookie values.
//!
//! A cookie value is `base64url(timestamp ∥ nonce ∥ ciphertext ∥ tag)`:
//!
//! - `timestamp`: issue time, 8 bytes, big-endian unix seconds
//! - `nonce`: 12 random bytes
//! - `ciphertext`: AES-GCM encryption of the JSON-serialized payload
//! - `tag`: HMAC-SHA256 over the security name, timestamp, nonce and ciphertext
//!
//! The tag is checked in constant time before anything is decrypted.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::config::CookieProviderConfig;
use crate::crypto::{derive_block_key, generate_random_key};
use crate::{SecretKey, SessionError};

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_LEN: usize = 8;
const NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const MAC_LEN: usize = 32;
const MIN_ENCODED_LEN: usize = TIMESTAMP_LEN + NONCE_LEN + GCM_TAG_LEN + MAC_LEN;

/// Why a cookie value was rejected.
///
/// These never reach application code: the provider treats every one of them
/// as "no session" and starts a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not valid base64, too short, or the payload failed to decrypt or parse.
    Malformed,
    /// The authentication tag does not match.
    Tampered,
    /// The cookie is older than the validity window.
    Expired,
}

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed => write!(f, "malformed cookie"),
            DecodeError::Tampered => write!(f, "cookie signature mismatch"),
            DecodeError::Expired => write!(f, "cookie expired"),
        }
    }
}

#[derive(Clone)]
enum BlockCipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// Key material for sealing and opening cookie values.
///
/// Built once from configuration and shared read-only between requests.
#[derive(Clone)]
pub struct CookieCodec {
    cipher: BlockCipher,
    /// HMAC keyed with the hash key; cloned for every tag.
    mac: HmacSha256,
    security_name: String,
}

impl fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cipher = match self.cipher {
            BlockCipher::Aes128(_) => "AES-128-GCM",
            BlockCipher::Aes256(_) => "AES-256-GCM",
        };
        f.debug_struct("CookieCodec")
            .field("cipher", &cipher)
            .field("hash_key", &"[REDACTED]")
            .field("security_name", &self.security_name)
            .finish()
    }
}

impl CookieCodec {
    /// Creates a codec from explicit key material.
    ///
    /// `block_key` selects the cipher: 16 bytes for AES-128, 32 bytes for
    /// AES-256.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the block key has another length
    /// or the hash key is empty.
    pub fn new(
        block_key: &[u8],
        hash_key: SecretKey,
        security_name: impl Into<String>,
    ) -> Result<Self, SessionError> {
        if hash_key.is_empty() {
            return Err(SessionError::Config("hash key must not be empty".to_owned()));
        }

        let cipher = match block_key.len() {
            16 => Aes128Gcm::new_from_slice(block_key)
                .ok()
                .map(|c| BlockCipher::Aes128(Box::new(c))),
            32 => Aes256Gcm::new_from_slice(block_key)
                .ok()
                .map(|c| BlockCipher::Aes256(Box::new(c))),
            _ => None,
        }
        .ok_or_else(|| {
            SessionError::Config(format!(
                "block key must be 16 or 32 bytes, got {}",
                block_key.len()
            ))
        })?;

        let mac = <HmacSha256 as Mac>::new_from_slice(hash_key.expose_secret())
            .map_err(|e| SessionError::Config(format!("invalid hash key: {e}")))?;

        Ok(Self {
            cipher,
            mac,
            security_name: security_name.into(),
        })
    }

    /// Creates a codec from the cookie provider configuration.
    ///
    /// Without an explicit `blockKey` the AES key is derived from
    /// `securityKey`. Without a `securityName` the provider's `cookieName`
    /// is bound into the tag instead; with neither, a random name is used and
    /// cookies will not survive a restart.
    pub fn from_config(config: &CookieProviderConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let security_name = match (&config.security_name, &config.cookie_name) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(name)) if !name.is_empty() => name.clone(),
            _ => {
                log::warn!(
                    target: "cookie_vault::codec",
                    "msg=\"no securityName configured, using a random one\""
                );
                hex::encode(generate_random_key(20)?)
            }
        };

        match &config.block_key {
            Some(block_key) => Self::new(
                block_key.expose_secret(),
                config.security_key.clone(),
                security_name,
            ),
            None => Self::new(
                &derive_block_key(&config.security_key),
                config.security_key.clone(),
                security_name,
            ),
        }
    }

    /// The name bound into every tag.
    pub fn security_name(&self) -> &str {
        &self.security_name
    }

    fn seal(&self, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let nonce = Nonce::from_slice(nonce);
        let sealed = match &self.cipher {
            BlockCipher::Aes128(c) => c.encrypt(nonce, plaintext),
            BlockCipher::Aes256(c) => c.encrypt(nonce, plaintext),
        };
        sealed.map_err(|_| SessionError::Encode("encryption failed".to_owned()))
    }

    fn open(&self, nonce: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let opened = match &self.cipher {
            BlockCipher::Aes128(c) => c.decrypt(nonce, ciphertext),
            BlockCipher::Aes256(c) => c.decrypt(nonce, ciphertext),
        };
        opened.ok()
    }

    fn mac(&self, timestamp: &[u8], body: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        let name = self.security_name.as_bytes();
        mac.update(&u32::try_from(name.len()).unwrap_or(u32::MAX).to_be_bytes());
        mac.update(name);
        mac.update(timestamp);
        mac.update(body);
        mac
    }
}

/// Seals `data` into a cookie value stamped with the current time.
pub fn encode_cookie<T: Serialize>(codec: &CookieCodec, data: &T) -> Result<String, SessionError> {
    encode_cookie_at(codec, data, Utc::now().timestamp())
}

/// Seals `data` into a cookie value stamped with `now` (unix seconds).
///
/// # Errors
///
/// Returns [`SessionError::Encode`] if serialization or encryption fails,
/// or [`SessionError::Entropy`] if no nonce could be generated.
pub fn encode_cookie_at<T: Serialize>(
    codec: &CookieCodec,
    data: &T,
    now: i64,
) -> Result<String, SessionError> {
    let plaintext =
        serde_json::to_vec(data).map_err(|e| SessionError::Encode(e.to_string()))?;

    let timestamp = now.to_be_bytes();
    let mut body = generate_random_key(NONCE_LEN)?;
    let ciphertext = codec.seal(&body, &plaintext)?;
    body.extend_from_slice(&ciphertext);

    let tag = codec.mac(&timestamp, &body).finalize().into_bytes();

    let mut raw = Vec::with_capacity(TIMESTAMP_LEN + body.len() + MAC_LEN);
    raw.extend_from_slice(&timestamp);
    raw.extend_from_slice(&body);
    raw.extend_from_slice(&tag);

    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// Opens a cookie value, checking it against the current time.
pub fn decode_cookie<T: DeserializeOwned>(
    codec: &CookieCodec,
    value: &str,
    max_age: i64,
) -> Result<T, DecodeError> {
    decode_cookie_at(codec, value, max_age, Utc::now().timestamp())
}

/// Opens a cookie value, checking its age against `now` (unix seconds).
///
/// A cookie issued at `t` is accepted up to and including `t + max_age`.
/// A `max_age` of zero or less disables the age check.
pub fn decode_cookie_at<T: DeserializeOwned>(
    codec: &CookieCodec,
    value: &str,
    max_age: i64,
    now: i64,
) -> Result<T, DecodeError> {
    let raw = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| DecodeError::Malformed)?;
    if raw.len() < MIN_ENCODED_LEN {
        return Err(DecodeError::Malformed);
    }

    let (timestamp_bytes, rest) = raw.split_at(TIMESTAMP_LEN);
    let (body, tag) = rest.split_at(rest.len() - MAC_LEN);

    if codec.mac(timestamp_bytes, body).verify_slice(tag).is_err() {
        log::warn!(
            target: "cookie_vault::codec",
            "msg=\"session cookie tampered\" cookie_prefix=\"{}...\"",
            value.chars().take(8).collect::<String>()
        );
        return Err(DecodeError::Tampered);
    }

    let timestamp = i64::from_be_bytes(
        timestamp_bytes
            .try_into()
            .map_err(|_| DecodeError::Malformed)?,
    );
    if max_age > 0 && now.saturating_sub(timestamp) > max_age {
        return Err(DecodeError::Expired);
    }

    let (nonce, ciphertext) = body.split_at(NONCE_LEN);
    let plaintext = codec.open(nonce, ciphertext).ok_or(DecodeError::Malformed)?;

    serde_json::from_slice(&plaintext).map_err(|_| DecodeError::Malformed)
}
