mod cookie;
mod provider;
mod store;

pub use cookie::{
    CookieOptions, MAX_COOKIE_SIZE, build_removal_cookie, build_session_cookie, read_cookie,
    write_cookie,
};
pub use provider::{CookieLoad, CookieProvider, SessionProvider};
pub use store::{CookieSession, SessionStore};

#[cfg(test)]
pub(crate) mod tests {
    use http::header::{COOKIE, SET_COOKIE};
    use http::{HeaderMap, HeaderValue};

    /// Builds the next request's headers the way a browser would: the
    /// `name=value` pair of every `Set-Cookie` goes into the `Cookie` header.
    pub(crate) fn request_from(response: &HeaderMap) -> HeaderMap {
        let pairs: Vec<&str> = response
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::trim)
            .collect();

        let mut request = HeaderMap::new();
        if !pairs.is_empty() {
            request.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
        }
        request
    }

    #[test]
    fn test_request_from() {
        let mut response = HeaderMap::new();
        response.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/; HttpOnly"));
        response.append(SET_COOKIE, HeaderValue::from_static("b=2; Max-Age=0"));

        let request = request_from(&response);
        assert_eq!(request.get(COOKIE).unwrap(), "a=1; b=2");
    }
}
