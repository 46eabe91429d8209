use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::{SecretKey, SessionError};

/// Default number of random bytes behind a session ID.
pub const DEFAULT_SESSION_ID_LENGTH: usize = 16;

const BLOCK_KEY_CONTEXT: &[u8] = b"cookie-vault block key";

/// Returns `length` bytes from the operating system's CSPRNG.
///
/// # Errors
///
/// Returns [`SessionError::Entropy`] if the OS random source fails.
///
/// # Example
///
/// ```rust
/// use cookie_vault::generate_random_key;
///
/// let key = generate_random_key(20).unwrap();
/// assert_eq!(key.len(), 20);
/// ```
pub fn generate_random_key(length: usize) -> Result<Vec<u8>, SessionError> {
    let mut key = vec![0u8; length];
    OsRng.try_fill_bytes(&mut key).map_err(|e| {
        log::error!(target: "cookie_vault::crypto", "msg=\"os rng failure\" error=\"{e}\"");
        SessionError::Entropy
    })?;
    Ok(key)
}

/// Generates a new session ID: `prefix` followed by the hex encoding of
/// `length` random bytes.
///
/// A zero `length` falls back to [`DEFAULT_SESSION_ID_LENGTH`].
pub fn generate_session_id(length: usize, prefix: &str) -> Result<String, SessionError> {
    let length = if length == 0 {
        DEFAULT_SESSION_ID_LENGTH
    } else {
        length
    };
    let bytes = generate_random_key(length)?;
    Ok(format!("{prefix}{}", hex::encode(bytes)))
}

/// Derives the 32-byte AES key from the configured security key.
///
/// Deterministic, so cookies stay readable across restarts and across
/// processes sharing the same configuration.
pub fn derive_block_key(security_key: &SecretKey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(BLOCK_KEY_CONTEXT);
    hasher.update(security_key.expose_secret());
    hasher.finalize().into()
}
