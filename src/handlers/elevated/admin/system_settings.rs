use axum::Extension;
use serde::Deserialize;

use crate::database::models::SystemSettings;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::AccountService;

/// GET /api/admin/system-settings
pub async fn system_settings_get() -> ApiResult<SystemSettings> {
    let pool = DatabaseManager::pool().await?;
    let settings = AccountService::new(pool).system_settings().await?;
    Ok(ApiResponse::success(settings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettingsRequest {
    pub allow_signup: bool,
}

/// PUT /api/admin/system-settings - open or close self-service signup
pub async fn system_settings_put(
    Extension(admin): Extension<AuthUser>,
    Payload(body): Payload<SystemSettingsRequest>,
) -> ApiResult<SystemSettings> {
    let pool = DatabaseManager::pool().await?;
    let settings = AccountService::new(pool).set_allow_signup(body.allow_signup).await?;
    tracing::info!("Super-admin {} set allowSignup={}", admin.id, settings.allow_signup);
    Ok(ApiResponse::success(settings))
}
