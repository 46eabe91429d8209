//! Session configuration.
//!
//! Configuration is loaded once at startup and is read-only afterwards. The
//! JSON shape follows the widely deployed cookie-provider format:
//!
//! ```rust
//! use cookie_vault::config::ManagerConfig;
//!
//! let config = ManagerConfig::from_json(
//!     r#"{"cookieName":"gosessionid","enableSetCookie":false,"gclifetime":3600,
//!         "ProviderConfig":"{\"cookieName\":\"gosessionid\",\"securityKey\":\"beegocookiehashkey\"}"}"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.cookie_name, "gosessionid");
//! assert!(!config.enable_set_cookie);
//!
//! let provider = config.provider().unwrap();
//! assert_eq!(provider.security_key.expose_secret(), b"beegocookiehashkey");
//! ```

use serde::Deserialize;

use crate::crypto::DEFAULT_SESSION_ID_LENGTH;
use crate::{SecretKey, SessionError};

/// Default cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "gosessionid";

/// Default validity window in seconds.
pub const DEFAULT_GC_LIFETIME: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

/// Process-wide session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Name of the session cookie.
    #[serde(rename = "cookieName")]
    pub cookie_name: String,

    /// Emit `Set-Cookie` on every release, not only when the session is new
    /// or changed.
    #[serde(rename = "enableSetCookie")]
    pub enable_set_cookie: bool,

    /// How long, in seconds, an issued cookie is accepted.
    #[serde(rename = "gclifetime")]
    pub gc_lifetime: i64,

    #[serde(rename = "disableHTTPOnly")]
    pub disable_http_only: bool,

    #[serde(rename = "secure")]
    pub secure: bool,

    /// `Max-Age` of the cookie in seconds. Zero falls back to the provider's
    /// `maxage`, then to `gclifetime`.
    #[serde(rename = "cookieLifeTime")]
    pub cookie_lifetime: i64,

    #[serde(rename = "cookiePath")]
    pub cookie_path: String,

    #[serde(rename = "domain")]
    pub domain: Option<String>,

    #[serde(rename = "cookieSameSite")]
    pub cookie_same_site: Option<SameSite>,

    /// Number of random bytes in a generated session ID.
    #[serde(rename = "sessionIDLength")]
    pub session_id_length: usize,

    #[serde(rename = "sessionIDPrefix")]
    pub session_id_prefix: String,

    /// Provider-specific settings, itself a JSON document.
    #[serde(rename = "providerConfig", alias = "ProviderConfig")]
    pub provider_config: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_owned(),
            enable_set_cookie: true,
            gc_lifetime: DEFAULT_GC_LIFETIME,
            disable_http_only: false,
            secure: false,
            cookie_lifetime: 0,
            cookie_path: "/".to_owned(),
            domain: None,
            cookie_same_site: None,
            session_id_length: DEFAULT_SESSION_ID_LENGTH,
            session_id_prefix: String::new(),
            provider_config: String::new(),
        }
    }
}

impl ManagerConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Fields that are absent keep their [`Default`] values.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SessionError::Config(format!("invalid manager config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::Config("cookieName must not be empty".to_owned()));
        }
        if !self.cookie_name.chars().all(is_cookie_name_char) {
            return Err(SessionError::Config(format!(
                "cookieName {:?} contains characters not allowed in a cookie name",
                self.cookie_name
            )));
        }
        if self.gc_lifetime < 0 {
            return Err(SessionError::Config("gclifetime must not be negative".to_owned()));
        }
        if self.cookie_lifetime < 0 {
            return Err(SessionError::Config(
                "cookieLifeTime must not be negative".to_owned(),
            ));
        }
        Ok(())
    }

    /// Parses the nested provider configuration.
    pub fn provider(&self) -> Result<CookieProviderConfig, SessionError> {
        if self.provider_config.trim().is_empty() {
            return Err(SessionError::Config("ProviderConfig is empty".to_owned()));
        }
        CookieProviderConfig::from_json(&self.provider_config)
    }
}

/// Settings specific to the cookie provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CookieProviderConfig {
    /// HMAC key, and source of the AES key when `blockKey` is absent.
    #[serde(rename = "securityKey")]
    pub security_key: SecretKey,

    /// Explicit AES key, 16 or 32 bytes.
    #[serde(rename = "blockKey")]
    pub block_key: Option<SecretKey>,

    /// Name bound into every cookie's authentication tag.
    #[serde(rename = "securityName")]
    pub security_name: Option<String>,

    #[serde(rename = "cookieName")]
    pub cookie_name: Option<String>,

    pub secure: bool,

    #[serde(rename = "maxage")]
    pub max_age: i64,
}

impl CookieProviderConfig {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SessionError::Config(format!("invalid provider config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.security_key.is_empty() {
            return Err(SessionError::Config("securityKey must not be empty".to_owned()));
        }
        if let Some(block_key) = &self.block_key {
            if !matches!(block_key.len(), 16 | 32) {
                return Err(SessionError::Config(format!(
                    "blockKey must be 16 or 32 bytes, got {}",
                    block_key.len()
                )));
            }
        }
        if self.security_key.len() < 32 {
            log::warn!(
                target: "cookie_vault::config",
                "msg=\"securityKey is shorter than 32 bytes\" len={}",
                self.security_key.len()
            );
        }
        Ok(())
    }
}

// RFC 6265 token characters.
fn is_cookie_name_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)
}
