//! Session and OAuth-state cookies.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config;

pub const SESSION_COOKIE: &str = "cascade_session";
pub const OAUTH_STATE_COOKIE: &str = "cascade_oauth_state";

/// `SameSite` cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    Strict,
    Lax,
}

/// Everything that ends up in one `Set-Cookie` header
#[derive(Debug, Clone)]
pub struct SecureCookieConfig {
    pub name: &'static str,
    pub value: String,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSitePolicy,
    pub path: &'static str,
}

impl SecureCookieConfig {
    /// HttpOnly, Lax, rooted at `/`; `Secure` when the base URL is https or HTTPS is required
    pub fn new(name: &'static str, value: impl Into<String>, max_age_secs: i64) -> Self {
        let security = &config::config().security;
        Self {
            name,
            value: value.into(),
            max_age_secs,
            http_only: true,
            secure: security.require_https || secure_base_url(&security.base_url),
            same_site: SameSitePolicy::Lax,
            path: "/",
        }
    }

    pub fn build(&self) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}",
            self.name, self.value, self.max_age_secs, self.path
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(match self.same_site {
            SameSitePolicy::Strict => "; SameSite=Strict",
            SameSitePolicy::Lax => "; SameSite=Lax",
        });
        cookie
    }

    pub fn append_to(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build()) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

fn secure_base_url(base_url: &str) -> bool {
    base_url.starts_with("https://")
}

pub fn set_session_cookie(headers: &mut HeaderMap, token: &str, max_age_secs: i64) {
    SecureCookieConfig::new(SESSION_COOKIE, token, max_age_secs).append_to(headers);
}

pub fn clear_session_cookie(headers: &mut HeaderMap) {
    SecureCookieConfig::new(SESSION_COOKIE, "", 0).append_to(headers);
}

/// Short-lived state cookie for the OAuth round trip
pub fn set_oauth_state_cookie(headers: &mut HeaderMap, state: &str) {
    SecureCookieConfig::new(OAUTH_STATE_COOKIE, state, 600).append_to(headers);
}

pub fn clear_oauth_state_cookie(headers: &mut HeaderMap) {
    SecureCookieConfig::new(OAUTH_STATE_COOKIE, "", 0).append_to(headers);
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
