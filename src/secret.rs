//! Key material wrapper.
//!
//! Keys loaded from configuration must never end up in log lines or panic
//! messages, so they travel inside [`SecretKey`].

use std::fmt;

use serde::{Deserialize, Deserializer};

/// Raw key bytes that refuse to print themselves.
///
/// `SecretKey` implements `Debug` and `Display` to show `[REDACTED]` instead
/// of the actual bytes.
///
/// # Example
///
/// ```rust
/// use cookie_vault::SecretKey;
///
/// let key = SecretKey::new("beegocookiehashkey");
///
/// assert_eq!(format!("{:?}", key), "SecretKey([REDACTED])");
/// assert_eq!(key.expose_secret(), b"beegocookiehashkey");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Creates a new `SecretKey` from anything convertible into bytes.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Exposes the key bytes.
    ///
    /// Use this only when handing the key to a cipher or MAC.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretKey {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for SecretKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for SecretKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// Keys only ever come in from configuration, so there is no Serialize impl.
impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretKey::from(s))
    }
}
