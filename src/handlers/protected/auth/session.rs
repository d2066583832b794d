use axum::{
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension,
};

use crate::auth::{cookies, SessionStore, SessionUser};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/session - the signed-in user as the session sees it
pub async fn session_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<SessionUser> {
    Ok(ApiResponse::success(SessionUser::from(&auth_user)))
}

/// POST /api/auth/sign-out - revoke the presented session and clear the cookie
pub async fn sign_out_post(Extension(auth_user): Extension<AuthUser>) -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;
    SessionStore::new(pool).revoke(&auth_user.token).await?;
    tracing::info!("User {} signed out", auth_user.id);

    let mut headers = HeaderMap::new();
    cookies::clear_session_cookie(&mut headers);
    Ok((headers, ApiResponse::ok()).into_response())
}
