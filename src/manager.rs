//! Request-level session lifecycle on top of a [`SessionProvider`].

use http::HeaderMap;

use crate::config::ManagerConfig;
use crate::crypto::generate_session_id;
use crate::session::{
    CookieOptions, CookieProvider, SessionProvider, SessionStore, build_removal_cookie,
    read_cookie, write_cookie,
};
use crate::SessionError;

/// Starts, destroys and regenerates sessions for HTTP requests.
///
/// The manager reads the session cookie from request headers, hands it to the
/// provider, and writes cookies back into response headers. It is built once
/// at startup and shared read-only between requests.
pub struct SessionManager<P: SessionProvider = CookieProvider> {
    provider: P,
    config: ManagerConfig,
    cookie: CookieOptions,
}

impl SessionManager<CookieProvider> {
    /// Creates a manager backed by [`CookieProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the configuration is invalid.
    pub fn cookie(config: ManagerConfig) -> Result<Self, SessionError> {
        let provider = CookieProvider::new(&config)?;
        Self::new(provider, config)
    }
}

impl<P: SessionProvider> SessionManager<P> {
    pub fn new(provider: P, config: ManagerConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let cookie = CookieOptions::from_manager(&config);
        Ok(Self {
            provider,
            config,
            cookie,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the session for this request, creating one if the request
    /// has no usable session cookie.
    ///
    /// When `enableSetCookie` is on, a new session's cookie is written to
    /// `response` right away.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_start", skip_all, err)
    )]
    pub async fn session_start(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<Box<dyn SessionStore>, SessionError> {
        let cookie_value = read_cookie(request, &self.config.cookie_name);

        let existing = match cookie_value.filter(|sid| !sid.is_empty()) {
            Some(sid) => self.provider.session_exist(&sid).await?.then_some(sid),
            None => None,
        };

        let mut session = match existing {
            Some(sid) => self.provider.session_read(&sid).await?,
            None => {
                let sid = self.new_session_id()?;
                self.provider.session_create(&sid).await?
            }
        };

        if self.config.enable_set_cookie && session.is_new() {
            session.session_release(response).await?;
        }

        Ok(session)
    }

    /// Ends the request's session and tells the client to drop its cookie.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_destroy", skip_all, err)
    )]
    pub async fn session_destroy(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        if let Some(sid) = read_cookie(request, &self.config.cookie_name).filter(|s| !s.is_empty())
        {
            self.provider.session_destroy(&sid).await?;
        }

        write_cookie(response, &build_removal_cookie(&self.cookie))?;

        log::info!(target: "cookie_vault::session", "msg=\"session destroyed\"");
        Ok(())
    }

    /// Moves the request's session data to a new session ID and issues the
    /// new cookie.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_regenerate_id", skip_all, err)
    )]
    pub async fn session_regenerate_id(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<Box<dyn SessionStore>, SessionError> {
        let sid = self.new_session_id()?;

        let mut session = match read_cookie(request, &self.config.cookie_name) {
            Some(old_sid) if !old_sid.is_empty() => {
                self.provider.session_regenerate(&old_sid, &sid).await?
            }
            _ => self.provider.session_create(&sid).await?,
        };

        session.session_release(response).await?;

        log::info!(target: "cookie_vault::session", "msg=\"session id regenerated\"");
        Ok(session)
    }

    /// Number of active sessions, as far as the provider can tell.
    pub async fn active_sessions(&self) -> Result<u64, SessionError> {
        self.provider.session_all().await
    }

    /// Runs one garbage-collection pass on the provider.
    pub async fn gc(&self) -> Result<u64, SessionError> {
        let pruned = self.provider.session_gc().await?;
        log::debug!(target: "cookie_vault::session", "msg=\"session gc\" pruned={pruned}");
        Ok(pruned)
    }

    fn new_session_id(&self) -> Result<String, SessionError> {
        generate_session_id(self.config.session_id_length, &self.config.session_id_prefix)
    }
}

#[cfg(test)]
mod tests {
    use http::header::SET_COOKIE;

    use super::*;
    use crate::session::tests::request_from;

    const CONFIG: &str = r#"{"cookieName":"gosessionid","enableSetCookie":true,"gclifetime":3600,"ProviderConfig":"{\"cookieName\":\"gosessionid\",\"securityKey\":\"beegocookiehashkey\"}"}"#;

    fn manager(json: &str) -> SessionManager {
        SessionManager::cookie(ManagerConfig::from_json(json).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_start_emits_cookie_when_enabled() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();

        let session = manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();

        assert!(session.is_new());
        assert!(response.contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn test_start_without_set_cookie_waits_for_release() {
        let manager = manager(
            r#"{"enableSetCookie":false,"ProviderConfig":"{\"securityKey\":\"beegocookiehashkey\"}"}"#,
        );
        let mut response = HeaderMap::new();

        let mut session = manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();
        assert!(!response.contains_key(SET_COOKIE));

        session.session_release(&mut response).await.unwrap();
        assert!(response.contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn test_start_resumes_same_session() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();
        let first = manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();

        let mut response2 = HeaderMap::new();
        let second = manager
            .session_start(&request_from(&response), &mut response2)
            .await
            .unwrap();

        assert!(!second.is_new());
        assert_eq!(second.session_id(), first.session_id());
    }

    #[tokio::test]
    async fn test_destroy_then_start_gets_new_id() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();
        let first = manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();

        let request = request_from(&response);
        let mut response = HeaderMap::new();
        manager.session_destroy(&request, &mut response).await.unwrap();

        let mut response2 = HeaderMap::new();
        let second = manager
            .session_start(&request_from(&response), &mut response2)
            .await
            .unwrap();

        assert!(second.is_new());
        assert_ne!(second.session_id(), first.session_id());
    }

    #[tokio::test]
    async fn test_regenerate_keeps_data_with_new_id() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();
        let mut session = manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();
        session.set("username", "astaxie".into());
        session.session_release(&mut response).await.unwrap();

        let mut response2 = HeaderMap::new();
        let regenerated = manager
            .session_regenerate_id(&request_from(&response), &mut response2)
            .await
            .unwrap();

        assert_ne!(regenerated.session_id(), session.session_id());
        assert_eq!(regenerated.get("username"), Some("astaxie".into()));

        let mut response3 = HeaderMap::new();
        let resumed = manager
            .session_start(&request_from(&response2), &mut response3)
            .await
            .unwrap();
        assert_eq!(resumed.session_id(), regenerated.session_id());
    }

    #[tokio::test]
    async fn test_regenerate_without_cookie() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();

        let session = manager
            .session_regenerate_id(&HeaderMap::new(), &mut response)
            .await
            .unwrap();

        assert!(session.is_new());
        assert!(response.contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn test_cookie_provider_keeps_no_server_state() {
        let manager = manager(CONFIG);
        let mut response = HeaderMap::new();
        manager
            .session_start(&HeaderMap::new(), &mut response)
            .await
            .unwrap();

        assert_eq!(manager.active_sessions().await.unwrap(), 0);
        assert_eq!(manager.gc().await.unwrap(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ManagerConfig {
            provider_config: r#"{"cookieName":"gosessionid"}"#.to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            SessionManager::cookie(config),
            Err(SessionError::Config(_))
        ));
    }
}
