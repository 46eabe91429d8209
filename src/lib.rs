//! Client-side session storage.
//!
//! Session data is serialized, encrypted with AES-GCM and signed with
//! HMAC-SHA256, then handed to the client as a cookie. Nothing is kept on the
//! server: every request recovers its session from the cookie it presents.
//!
//! # Example
//!
//! ```rust
//! use cookie_vault::{ManagerConfig, SessionManager, SessionStore};
//! use http::HeaderMap;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), cookie_vault::SessionError> {
//! let config = ManagerConfig::from_json(
//!     r#"{"cookieName":"gosessionid","gclifetime":3600,
//!         "ProviderConfig":"{\"securityKey\":\"k\"}"}"#,
//! )?;
//! let manager = SessionManager::cookie(config)?;
//!
//! let mut response = HeaderMap::new();
//! let mut session = manager.session_start(&HeaderMap::new(), &mut response).await?;
//! session.set("username", "astaxie".into());
//! session.session_release(&mut response).await?;
//!
//! assert!(response.contains_key(http::header::SET_COOKIE));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod manager;
pub mod secret;
pub mod session;
pub mod value;

pub use codec::{CookieCodec, DecodeError, decode_cookie, encode_cookie};
pub use config::{CookieProviderConfig, ManagerConfig, SameSite};
pub use crypto::{generate_random_key, generate_session_id};
pub use manager::SessionManager;
pub use secret::SecretKey;
pub use session::{CookieProvider, CookieSession, SessionProvider, SessionStore};
pub use value::{SessionData, SessionValue};

use std::fmt;

/// Errors surfaced by the session layer.
///
/// Problems with a cookie presented by the client are deliberately absent:
/// those are absorbed into a fresh session and only ever show up as a
/// [`DecodeError`] in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed configuration or missing key material. Fatal at startup.
    Config(String),
    /// The operating system's random number generator is unavailable.
    Entropy,
    /// Serializing or encrypting a session payload failed.
    Encode(String),
    /// A storage backend failed.
    Backend(String),
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(msg) => write!(f, "Invalid session configuration: {}", msg),
            SessionError::Entropy => write!(f, "Random number generator unavailable"),
            SessionError::Encode(msg) => write!(f, "Failed to encode session: {}", msg),
            SessionError::Backend(msg) => write!(f, "Session backend error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SessionError::Config("securityKey is empty".to_owned()).to_string(),
            "Invalid session configuration: securityKey is empty"
        );
        assert_eq!(
            SessionError::Entropy.to_string(),
            "Random number generator unavailable"
        );
        assert_eq!(
            SessionError::Encode("boom".to_owned()).to_string(),
            "Failed to encode session: boom"
        );
    }
}
