//! Session provider contract and the cookie-backed provider.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;

use super::cookie::{CookieOptions, build_removal_cookie, read_cookie, write_cookie};
use super::store::{CookieSession, SessionEnvelope, SessionStore};
use crate::codec::{CookieCodec, DecodeError, decode_cookie};
use crate::config::ManagerConfig;
use crate::crypto::generate_session_id;
use crate::value::SessionData;
use crate::SessionError;

/// Storage backend driven by [`SessionManager`](crate::SessionManager).
///
/// Implementations provide different storage strategies. Only
/// [`CookieProvider`] ships with this crate: it keeps everything in the
/// client's cookie, so several operations are no-ops for it.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Loads the session identified by `sid`, the value of the request's
    /// session cookie.
    async fn session_read(&self, sid: &str) -> Result<Box<dyn SessionStore>, SessionError>;

    /// Creates an empty session with a freshly generated ID.
    async fn session_create(&self, sid: &str) -> Result<Box<dyn SessionStore>, SessionError>;

    /// Returns true if `sid` may name an existing session.
    async fn session_exist(&self, sid: &str) -> Result<bool, SessionError>;

    /// Moves the data of `old_sid` to a session named `sid`.
    async fn session_regenerate(
        &self,
        old_sid: &str,
        sid: &str,
    ) -> Result<Box<dyn SessionStore>, SessionError>;

    /// Invalidates the session on the server side.
    async fn session_destroy(&self, sid: &str) -> Result<(), SessionError>;

    /// Counts active sessions.
    async fn session_all(&self) -> Result<u64, SessionError>;

    /// Removes expired sessions, returning how many were dropped.
    async fn session_gc(&self) -> Result<u64, SessionError>;
}

/// Immutable state shared by the provider and every session it hands out.
#[derive(Debug)]
pub(crate) struct ProviderState {
    pub(crate) codec: CookieCodec,
    pub(crate) cookie: CookieOptions,
    pub(crate) max_age: i64,
    pub(crate) always_set_cookie: bool,
    pub(crate) id_length: usize,
    pub(crate) id_prefix: String,
}

/// Outcome of reading the session cookie from a request.
///
/// A cookie that fails to decode is not an error: it is recovered as an
/// empty session, and the reason is kept only for logging.
#[derive(Debug)]
pub enum CookieLoad {
    Loaded { sid: String, values: SessionData },
    Recovered(DecodeError),
    Absent,
}

/// Session provider that stores all session state in the client's cookie.
///
/// Cloning is cheap: clones share the same key material.
///
/// # Example
///
/// ```rust
/// use cookie_vault::{CookieProvider, ManagerConfig, SessionStore};
/// use http::HeaderMap;
///
/// let config = ManagerConfig {
///     provider_config: r#"{"securityKey":"k"}"#.to_owned(),
///     ..Default::default()
/// };
/// let provider = CookieProvider::new(&config).unwrap();
///
/// let mut session = provider.start(&HeaderMap::new()).unwrap();
/// session.set("username", "astaxie".into());
///
/// let mut response = HeaderMap::new();
/// provider.release(&mut session, &mut response).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CookieProvider {
    state: Arc<ProviderState>,
}

impl CookieProvider {
    /// Builds the provider from the manager configuration, parsing the nested
    /// provider settings and deriving the keys.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] on malformed settings or missing key
    /// material.
    pub fn new(config: &ManagerConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let provider_config = config.provider()?;
        let codec = CookieCodec::from_config(&provider_config)?;

        log::info!(
            target: "cookie_vault::session",
            "msg=\"cookie provider initialized\" cookie_name=\"{}\" gclifetime={}",
            config.cookie_name,
            config.gc_lifetime
        );

        Ok(Self {
            state: Arc::new(ProviderState {
                codec,
                cookie: CookieOptions::resolve(config, &provider_config),
                max_age: config.gc_lifetime,
                always_set_cookie: config.enable_set_cookie,
                id_length: config.session_id_length,
                id_prefix: config.session_id_prefix.clone(),
            }),
        })
    }

    /// Decodes a cookie value without building a session.
    pub fn load(&self, cookie_value: Option<&str>) -> CookieLoad {
        let Some(value) = cookie_value.filter(|v| !v.is_empty()) else {
            return CookieLoad::Absent;
        };

        match decode_cookie::<SessionEnvelope>(&self.state.codec, value, self.state.max_age) {
            Ok(envelope) if envelope.sid.is_empty() => CookieLoad::Recovered(DecodeError::Malformed),
            Ok(envelope) => CookieLoad::Loaded {
                sid: envelope.sid,
                values: envelope.values,
            },
            Err(reason) => CookieLoad::Recovered(reason),
        }
    }

    /// Starts the session for a request: resumes the one in its cookie, or
    /// begins a new one if the cookie is missing or unusable.
    ///
    /// # Errors
    ///
    /// Only fails if no session ID can be generated.
    pub fn start(&self, request: &HeaderMap) -> Result<CookieSession, SessionError> {
        let value = read_cookie(request, &self.state.cookie.name);
        self.open(value.as_deref())
    }

    /// Persists `session` into `response`. See [`CookieSession::release`].
    pub fn release(
        &self,
        session: &mut CookieSession,
        response: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        session.release(response)
    }

    /// Tells the client to drop its session cookie.
    ///
    /// The cookie is the only copy of the session, so once the client has
    /// discarded it the next [`start`](Self::start) begins a new session.
    pub fn destroy(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<(), SessionError> {
        let value = read_cookie(request, &self.state.cookie.name);
        if let CookieLoad::Loaded { sid, .. } = self.load(value.as_deref()) {
            log::info!(
                target: "cookie_vault::session",
                "msg=\"session destroyed\" sid_prefix=\"{}...\"",
                sid.chars().take(8).collect::<String>()
            );
        }
        write_cookie(response, &build_removal_cookie(&self.state.cookie))
    }

    fn open(&self, cookie_value: Option<&str>) -> Result<CookieSession, SessionError> {
        match self.load(cookie_value) {
            CookieLoad::Loaded { sid, values } => Ok(CookieSession::resumed(
                SessionEnvelope { sid, values },
                Arc::clone(&self.state),
            )),
            CookieLoad::Recovered(reason) => {
                log::info!(
                    target: "cookie_vault::session",
                    "msg=\"session cookie rejected, starting new session\" reason=\"{reason}\""
                );
                self.fresh()
            }
            CookieLoad::Absent => self.fresh(),
        }
    }

    fn fresh(&self) -> Result<CookieSession, SessionError> {
        let sid = generate_session_id(self.state.id_length, &self.state.id_prefix)?;
        Ok(CookieSession::fresh(sid, Arc::clone(&self.state)))
    }
}

#[async_trait]
impl SessionProvider for CookieProvider {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_read", skip_all, err)
    )]
    async fn session_read(&self, sid: &str) -> Result<Box<dyn SessionStore>, SessionError> {
        Ok(Box::new(self.open(Some(sid))?))
    }

    async fn session_create(&self, sid: &str) -> Result<Box<dyn SessionStore>, SessionError> {
        Ok(Box::new(CookieSession::fresh(
            sid.to_owned(),
            Arc::clone(&self.state),
        )))
    }

    async fn session_exist(&self, sid: &str) -> Result<bool, SessionError> {
        Ok(!sid.is_empty())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_regenerate", skip_all, err)
    )]
    async fn session_regenerate(
        &self,
        old_sid: &str,
        sid: &str,
    ) -> Result<Box<dyn SessionStore>, SessionError> {
        let values = match self.load(Some(old_sid)) {
            CookieLoad::Loaded { values, .. } => values,
            CookieLoad::Recovered(_) | CookieLoad::Absent => SessionData::new(),
        };
        Ok(Box::new(CookieSession::regenerated(
            sid.to_owned(),
            values,
            Arc::clone(&self.state),
        )))
    }

    // The client holds the only copy; the manager's removal cookie does the work.
    async fn session_destroy(&self, _sid: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn session_all(&self) -> Result<u64, SessionError> {
        Ok(0)
    }

    async fn session_gc(&self) -> Result<u64, SessionError> {
        Ok(0)
    }
}
