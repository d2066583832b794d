use axum::Extension;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::password::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use crate::auth::SessionStore;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::validation::validate_len;
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

/// POST /api/settings/password - change (or first set) the password
///
/// Other sessions of the user are revoked; the caller's own stays valid.
pub async fn password_post(
    Extension(auth_user): Extension<AuthUser>,
    Payload(body): Payload<PasswordRequest>,
) -> ApiResult<Value> {
    validate_len("newPassword", &body.new_password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)?;

    let pool = DatabaseManager::pool().await?;
    AccountService::new(pool.clone())
        .change_password(auth_user.id, body.current_password.as_deref(), &body.new_password)
        .await?;
    SessionStore::new(pool)
        .revoke_user(auth_user.id, Some(&auth_user.token))
        .await?;

    Ok(ApiResponse::ok())
}
