//! Per-request session state.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::cookie::{MAX_COOKIE_SIZE, build_session_cookie, write_cookie};
use super::provider::ProviderState;
use crate::codec::encode_cookie;
use crate::value::{SessionData, SessionValue};
use crate::SessionError;

/// One request's view of a session.
///
/// Implementations are owned by a single request and must not be cached or
/// shared between requests. Reads and writes only touch memory; nothing is
/// persisted until [`session_release`](SessionStore::session_release).
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn session_id(&self) -> &str;

    fn get(&self, key: &str) -> Option<SessionValue>;

    fn set(&mut self, key: &str, value: SessionValue);

    /// Removes `key`, returning its previous value.
    fn delete(&mut self, key: &str) -> Option<SessionValue>;

    /// Removes every key.
    fn flush(&mut self);

    /// True if the session was created during this request.
    fn is_new(&self) -> bool;

    /// Persists the session and writes whatever the client needs into the
    /// response headers.
    async fn session_release(&mut self, response: &mut HeaderMap) -> Result<(), SessionError>;
}

/// What is sealed inside the cookie: the session ID travels with the data so
/// a resumed session keeps its identity.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionEnvelope {
    pub(crate) sid: String,
    pub(crate) values: SessionData,
}

#[derive(Serialize)]
struct SessionEnvelopeRef<'a> {
    sid: &'a str,
    values: &'a SessionData,
}

/// A session whose entire state lives in the client's cookie.
#[derive(Debug)]
pub struct CookieSession {
    sid: String,
    values: SessionData,
    is_new: bool,
    dirty: bool,
    state: Arc<ProviderState>,
}

impl CookieSession {
    pub(crate) fn fresh(sid: String, state: Arc<ProviderState>) -> Self {
        Self {
            sid,
            values: SessionData::new(),
            is_new: true,
            dirty: true,
            state,
        }
    }

    pub(crate) fn resumed(envelope: SessionEnvelope, state: Arc<ProviderState>) -> Self {
        Self {
            sid: envelope.sid,
            values: envelope.values,
            is_new: false,
            dirty: false,
            state,
        }
    }

    /// Same data under a new identity.
    pub(crate) fn regenerated(sid: String, values: SessionData, state: Arc<ProviderState>) -> Self {
        Self {
            sid,
            values,
            is_new: true,
            dirty: true,
            state,
        }
    }

    /// Read-only view of every value in the session.
    pub fn values(&self) -> &SessionData {
        &self.values
    }

    /// True if the session has changes the client has not been sent yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Encodes the session and writes it as a `Set-Cookie` header.
    ///
    /// Nothing is written when the session is unchanged, unless the manager
    /// is configured to emit the cookie on every response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] or [`SessionError::Entropy`] if the
    /// cookie could not be sealed, or [`SessionError::Encode`] if the
    /// resulting `Set-Cookie` exceeds [`MAX_COOKIE_SIZE`]. The session stays
    /// dirty in either case and `response` is left untouched.
    pub fn release(&mut self, response: &mut HeaderMap) -> Result<(), SessionError> {
        if !self.dirty && !self.state.always_set_cookie {
            return Ok(());
        }

        let envelope = SessionEnvelopeRef {
            sid: &self.sid,
            values: &self.values,
        };
        let value = encode_cookie(&self.state.codec, &envelope)?;
        let cookie = build_session_cookie(value, &self.state.cookie);

        let size = cookie.to_string().len();
        if size > MAX_COOKIE_SIZE {
            log::warn!(
                target: "cookie_vault::session",
                "msg=\"session cookie too large\" size={size} limit={MAX_COOKIE_SIZE}"
            );
            return Err(SessionError::Encode(format!(
                "session cookie is {size} bytes, limit is {MAX_COOKIE_SIZE}"
            )));
        }

        write_cookie(response, &cookie)?;

        log::debug!(
            target: "cookie_vault::session",
            "msg=\"session cookie issued\" keys={}",
            self.values.len()
        );

        self.dirty = false;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for CookieSession {
    fn session_id(&self) -> &str {
        &self.sid
    }

    fn get(&self, key: &str) -> Option<SessionValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SessionValue) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_owned(), value);
            self.dirty = true;
        }
    }

    fn delete(&mut self, key: &str) -> Option<SessionValue> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    fn flush(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.dirty = true;
        }
    }

    fn is_new(&self) -> bool {
        self.is_new
    }

    async fn session_release(&mut self, response: &mut HeaderMap) -> Result<(), SessionError> {
        self.release(response)
    }
}
