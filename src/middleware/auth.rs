use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{cookies, SessionStore, SessionUser};
use crate::database::models::User;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::types::{Role, UserStatus};

/// The signed-in user, resolved fresh from `users` (or the session cache)
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub is_pro: bool,
    pub status: UserStatus,
    /// Raw session token, kept so password changes can spare the current session
    pub token: String,
}

impl AuthUser {
    pub fn from_user(user: User, token: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
            role: user.role,
            is_pro: user.is_pro,
            status: user.status,
            token,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

impl From<&AuthUser> for SessionUser {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            role: user.role,
            is_pro: user.is_pro,
            status: user.status,
        }
    }
}

/// Resolves the session token and injects `AuthUser`; rejects with 401 otherwise
pub async fn session_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&headers).ok_or_else(unauthorized)?;

    let pool = DatabaseManager::pool().await?;
    let user = SessionStore::new(pool)
        .resolve(&token)
        .await?
        .ok_or_else(unauthorized)?;

    if user.status == UserStatus::Disabled {
        tracing::warn!("Rejected session for disabled user {}", user.id);
        return Err(unauthorized());
    }

    request.extensions_mut().insert(AuthUser::from_user(user, token));
    Ok(next.run(request).await)
}

/// Must run after `session_auth_middleware`
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request.extensions().get::<AuthUser>().ok_or_else(unauthorized)?;

    if !auth_user.is_super_admin() {
        tracing::warn!("User {} denied elevated route {}", auth_user.id, request.uri().path());
        return Err(unauthorized());
    }
    Ok(next.run(request).await)
}

fn unauthorized() -> ApiError {
    ApiError::unauthorized("Unauthorized.")
}

/// Bearer header first, then the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        cookies::get_cookie_value(headers, cookies::SESSION_COOKIE).filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        headers.insert("cookie", HeaderValue::from_static("cascade_session=fromcookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; cascade_session=tok"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn missing_or_blank_tokens_are_ignored() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_session_token(&headers).is_none());

        let mut basic = HeaderMap::new();
        basic.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_session_token(&basic).is_none());
    }
}
