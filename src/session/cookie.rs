//! Reading the session cookie from a request and writing `Set-Cookie`
//! headers to a response.

use cookie::{Cookie, SameSite as CookieSameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use time::{Duration, OffsetDateTime};

use crate::config::{CookieProviderConfig, ManagerConfig, SameSite};
use crate::SessionError;

/// Largest `Set-Cookie` value, attributes included, that browsers are
/// required to store.
pub const MAX_COOKIE_SIZE: usize = 4096;

/// Attributes of the session cookie, resolved once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    /// `Max-Age` in seconds; `None` makes it a browser-session cookie.
    pub max_age: Option<i64>,
}

impl CookieOptions {
    /// Resolves attributes from the manager settings alone.
    pub fn from_manager(config: &ManagerConfig) -> Self {
        let max_age = [config.cookie_lifetime, config.gc_lifetime]
            .into_iter()
            .find(|secs| *secs > 0);

        Self {
            name: config.cookie_name.clone(),
            path: config.cookie_path.clone(),
            domain: config.domain.clone().filter(|d| !d.is_empty()),
            secure: config.secure,
            http_only: !config.disable_http_only,
            same_site: config.cookie_same_site,
            max_age,
        }
    }

    /// Resolves attributes, letting the provider's `secure` and `maxage`
    /// fill in what the manager leaves unset.
    pub fn resolve(config: &ManagerConfig, provider: &CookieProviderConfig) -> Self {
        let max_age = [config.cookie_lifetime, provider.max_age, config.gc_lifetime]
            .into_iter()
            .find(|secs| *secs > 0);

        Self {
            secure: config.secure || provider.secure,
            max_age,
            ..Self::from_manager(config)
        }
    }
}

/// Returns the value of the cookie called `name`, if the request carries one.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

pub fn build_session_cookie(value: String, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((options.name.clone(), value))
        .path(options.path.clone())
        .http_only(options.http_only);

    if options.secure {
        builder = builder.secure(true);
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(to_cookie_same_site(same_site));
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(secs) = options.max_age {
        builder = builder.max_age(Duration::seconds(secs));
    }

    builder.build()
}

/// An empty cookie that has already expired, telling the client to drop it.
pub fn build_removal_cookie(options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((options.name.clone(), String::new()))
        .path(options.path.clone())
        .http_only(options.http_only)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH);

    if options.secure {
        builder = builder.secure(true);
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(to_cookie_same_site(same_site));
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}

/// Adds `cookie` as a `Set-Cookie` header, replacing any earlier
/// `Set-Cookie` for the same name.
pub fn write_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionError::Encode(format!("invalid Set-Cookie header: {e}")))?;

    let prefix = format!("{}=", cookie.name());
    let kept: Vec<HeaderValue> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter(|existing| !existing.as_bytes().starts_with(prefix.as_bytes()))
        .cloned()
        .collect();

    headers.remove(SET_COOKIE);
    for existing in kept {
        headers.append(SET_COOKIE, existing);
    }
    headers.append(SET_COOKIE, value);

    Ok(())
}

fn to_cookie_same_site(same_site: SameSite) -> CookieSameSite {
    match same_site {
        SameSite::None => CookieSameSite::None,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::Strict => CookieSameSite::Strict,
    }
}
