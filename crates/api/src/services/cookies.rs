//! HttpOnly cookie transport for the access and refresh tokens.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use crate::config::CookieConfig;

/// Which of the two auth cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCookie {
    Access,
    Refresh,
}

/// Builds and reads the auth cookies according to [`CookieConfig`].
#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: CookieConfig,
    access_max_age: i64,
    refresh_max_age: i64,
}

impl CookieHelper {
    pub fn new(config: CookieConfig, access_max_age: i64, refresh_max_age: i64) -> Self {
        Self {
            config,
            access_max_age,
            refresh_max_age,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn name(&self, cookie: AuthCookie) -> &str {
        match cookie {
            AuthCookie::Access => &self.config.access_token_name,
            AuthCookie::Refresh => &self.config.refresh_token_name,
        }
    }

    fn path(&self, cookie: AuthCookie) -> &str {
        match cookie {
            AuthCookie::Access => &self.config.access_token_path,
            AuthCookie::Refresh => &self.config.refresh_token_path,
        }
    }

    fn max_age(&self, cookie: AuthCookie) -> i64 {
        match cookie {
            AuthCookie::Access => self.access_max_age,
            AuthCookie::Refresh => self.refresh_max_age,
        }
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn set_cookie(&self, cookie: AuthCookie, token: &str) -> String {
        let head = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name(cookie),
            token,
            self.path(cookie),
            self.max_age(cookie)
        );
        self.with_attributes(head)
    }

    /// `Set-Cookie` value that expires the cookie immediately.
    pub fn clear_cookie(&self, cookie: AuthCookie) -> String {
        let head = format!(
            "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.name(cookie),
            self.path(cookie)
        );
        self.with_attributes(head)
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly");
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(&self.config.same_site);
        if let Some(domain) = self.config.domain.as_deref().filter(|d| !d.is_empty()) {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie
    }

    /// Appends both token cookies. No-op when cookies are disabled.
    pub fn append_tokens(&self, headers: &mut HeaderMap, access_token: &str, refresh_token: &str) {
        if !self.config.enabled {
            return;
        }
        for value in [
            self.set_cookie(AuthCookie::Access, access_token),
            self.set_cookie(AuthCookie::Refresh, refresh_token),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.append(SET_COOKIE, value);
            }
        }
    }

    /// Appends expiring versions of both cookies. No-op when disabled.
    pub fn append_clear(&self, headers: &mut HeaderMap) {
        if !self.config.enabled {
            return;
        }
        for value in [
            self.clear_cookie(AuthCookie::Access),
            self.clear_cookie(AuthCookie::Refresh),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.append(SET_COOKIE, value);
            }
        }
    }

    /// Reads an auth cookie from the request. Ignored when disabled.
    pub fn read<'a>(&self, headers: &'a HeaderMap, cookie: AuthCookie) -> Option<&'a str> {
        if !self.config.enabled {
            return None;
        }
        let wanted = self.name(cookie);
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == wanted && !value.is_empty())
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> CookieHelper {
        CookieHelper::new(CookieConfig::default(), 900, 604_800)
    }

    #[test]
    fn test_access_cookie_attributes() {
        let cookie = helper().set_cookie(AuthCookie::Access, "tok");
        assert!(cookie.starts_with("access_token=tok; Path=/; Max-Age=900"));
        assert!(cookie.contains("; HttpOnly"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("; SameSite=Lax"));
        assert!(!cookie.contains("Domain="));
    }

    #[test]
    fn test_refresh_cookie_scoped_to_auth_path() {
        let cookie = helper().set_cookie(AuthCookie::Refresh, "r");
        assert!(cookie.starts_with("refresh_token=r; Path=/auth; Max-Age=604800"));
    }

    #[test]
    fn test_clear_cookie() {
        let cookie = helper().clear_cookie(AuthCookie::Refresh);
        assert!(cookie.starts_with("refresh_token=; Path=/auth; Max-Age=0"));
        assert!(cookie.contains("1970"));
    }

    #[test]
    fn test_domain_and_insecure() {
        let config = CookieConfig {
            secure: false,
            domain: Some("example.com".to_string()),
            ..CookieConfig::default()
        };
        let cookie = CookieHelper::new(config, 1, 2).set_cookie(AuthCookie::Access, "t");
        assert!(!cookie.contains("Secure"));
        assert!(cookie.ends_with("; Domain=example.com"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc; refresh_token=xyz"),
        );
        let helper = helper();
        assert_eq!(helper.read(&headers, AuthCookie::Access), Some("abc"));
        assert_eq!(helper.read(&headers, AuthCookie::Refresh), Some("xyz"));
    }

    #[test]
    fn test_empty_cookie_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(helper().read(&headers, AuthCookie::Access), None);
    }

    #[test]
    fn test_disabled_helper_neither_reads_nor_writes() {
        let config = CookieConfig {
            enabled: false,
            ..CookieConfig::default()
        };
        let helper = CookieHelper::new(config, 1, 2);

        let mut headers = HeaderMap::new();
        helper.append_tokens(&mut headers, "a", "r");
        assert!(headers.get(SET_COOKIE).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("access_token=abc"));
        assert_eq!(helper.read(&headers, AuthCookie::Access), None);
    }

    #[test]
    fn test_append_tokens_sets_two_headers() {
        let mut headers = HeaderMap::new();
        helper().append_tokens(&mut headers, "a", "r");
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }
}
