// handlers/public/auth/oauth.rs - Google OAuth redirect and callback

use axum::{
    extract::Query,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::auth::oauth::{GoogleOAuth, GoogleProfile, OAuthError, GOOGLE_PROVIDER};
use crate::auth::{cookies, tokens, SessionStore};
use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::services::accounts::OAuthIdentity;
use crate::services::AccountService;

pub const CALLBACK_PATH: &str = "/auth/oauth/google/callback";
const CALLBACK_ERROR: &str = "OAuthCallback";

fn redirect_uri() -> String {
    let base = config::config().security.base_url.trim_end_matches('/');
    format!("{}{}", base, CALLBACK_PATH)
}

/// 302 with any extra headers (cookies) already set
fn found(location: &str, mut headers: HeaderMap) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
            (StatusCode::FOUND, headers).into_response()
        }
        Err(_) => ApiError::internal_server_error("Invalid redirect target").into_response(),
    }
}

fn sign_in_error(code: &str) -> Response {
    let mut headers = HeaderMap::new();
    cookies::clear_oauth_state_cookie(&mut headers);
    found(&format!("/sign-in?error={}", code), headers)
}

fn client() -> Result<GoogleOAuth, ApiError> {
    GoogleOAuth::from_config(&config::config().oauth).map_err(|e| match e {
        OAuthError::NotConfigured => ApiError::not_found("Not found."),
        other => {
            tracing::error!("Google client setup failed: {}", other);
            ApiError::internal_server_error("Google sign-in unavailable")
        }
    })
}

/// GET /auth/oauth/google - start the authorization round trip
pub async fn google_start() -> Result<Response, ApiError> {
    let google = client()?;
    let state = tokens::random_hex(16);
    let url = google.authorize_url(&redirect_uri(), &state).map_err(|e| {
        tracing::error!("Failed to build Google authorize URL: {}", e);
        ApiError::internal_server_error("Google sign-in unavailable")
    })?;

    let mut headers = HeaderMap::new();
    cookies::set_oauth_state_cookie(&mut headers, &state);
    Ok(found(&url, headers))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl From<GoogleProfile> for OAuthIdentity {
    fn from(profile: GoogleProfile) -> Self {
        Self {
            provider: GOOGLE_PROVIDER,
            provider_account_id: profile.sub,
            email: profile.email,
            email_verified: profile.email_verified,
            name: profile.name,
            image: profile.picture,
        }
    }
}

/// True when the `state` query parameter matches the cookie set by `google_start`
pub fn state_matches(headers: &HeaderMap, state: Option<&str>) -> bool {
    match (cookies::get_cookie_value(headers, cookies::OAUTH_STATE_COOKIE), state) {
        (Some(expected), Some(actual)) => !actual.is_empty() && expected == actual,
        _ => false,
    }
}

/// GET /auth/oauth/google/callback - finish sign-in and land on the dashboard
///
/// Failures never surface as JSON: the browser is sent to `/sign-in?error=<code>`.
pub async fn google_callback(headers: HeaderMap, Query(query): Query<CallbackQuery>) -> Result<Response, ApiError> {
    let google = client()?;

    if let Some(error) = query.error.as_deref() {
        tracing::info!("Google returned an error: {}", error);
        return Ok(sign_in_error("AccessDenied"));
    }
    if !state_matches(&headers, query.state.as_deref()) {
        tracing::warn!("OAuth state mismatch");
        return Ok(sign_in_error(CALLBACK_ERROR));
    }
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok(sign_in_error(CALLBACK_ERROR));
    };

    let profile = match fetch_profile(&google, code).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Google code exchange failed: {}", e);
            return Ok(sign_in_error(CALLBACK_ERROR));
        }
    };

    let pool = DatabaseManager::pool().await?;
    let identity = OAuthIdentity::from(profile);
    let user = match AccountService::new(pool.clone()).oauth_sign_in(&identity).await {
        Ok(Ok(user)) => user,
        Ok(Err(denied)) => {
            tracing::info!("Google sign-in denied: {}", denied);
            return Ok(sign_in_error(denied.code()));
        }
        Err(e) => {
            tracing::error!("Google sign-in failed: {}", e);
            return Ok(sign_in_error(CALLBACK_ERROR));
        }
    };

    let session = SessionStore::new(pool).issue(&user).await?;
    let mut response_headers = HeaderMap::new();
    cookies::clear_oauth_state_cookie(&mut response_headers);
    cookies::set_session_cookie(&mut response_headers, &session.token, session.max_age_secs());

    tracing::info!("User {} signed in with Google", user.id);
    Ok(found("/dashboard", response_headers))
}

async fn fetch_profile(google: &GoogleOAuth, code: &str) -> Result<GoogleProfile, OAuthError> {
    let access_token = google.exchange_code(code, &redirect_uri()).await?;
    google.fetch_profile(&access_token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_must_match_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("cascade_oauth_state=abc123"));
        assert!(state_matches(&headers, Some("abc123")));
        assert!(!state_matches(&headers, Some("other")));
        assert!(!state_matches(&headers, None));
        assert!(!state_matches(&HeaderMap::new(), Some("abc123")));
    }

    #[test]
    fn error_redirect_carries_code() {
        let response = sign_in_error("OAuthAccountNotLinked");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/sign-in?error=OAuthAccountNotLinked"
        );
    }
}
