// handlers/public/auth/sign_in.rs - POST /auth/sign-in handler

use axum::{
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{cookies, password::MIN_PASSWORD_LEN, SessionStore, SessionUser};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, Payload};
use crate::services::validation::is_valid_email;
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user: SessionUser,
    pub token: String,
    pub expires: DateTime<Utc>,
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid email or password.")
}

/// POST /auth/sign-in - credential sign-in
///
/// Sets the session cookie and also returns the token for bearer clients.
/// Every failure is the same 401.
pub async fn sign_in_post(Payload(body): Payload<SignInRequest>) -> Result<Response, ApiError> {
    let email = body.email.trim().to_ascii_lowercase();
    if !is_valid_email(&email) || body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid_credentials());
    }

    let pool = DatabaseManager::pool().await?;
    let Some(user) = AccountService::new(pool.clone())
        .authenticate(&email, &body.password)
        .await?
    else {
        tracing::info!("Failed sign-in for {}", email);
        return Err(invalid_credentials());
    };

    let session = SessionStore::new(pool).issue(&user).await?;

    let mut headers = HeaderMap::new();
    cookies::set_session_cookie(&mut headers, &session.token, session.max_age_secs());

    let body = SignInResponse {
        user: SessionUser::from(&user),
        token: session.token,
        expires: session.expires,
    };
    Ok((headers, ApiResponse::success(body)).into_response())
}
