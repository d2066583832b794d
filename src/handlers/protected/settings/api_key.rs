use axum::Extension;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::settings::IssuedApiKey;
use crate::services::SettingsService;

/// POST /api/settings/api-key - issue a new key; it is shown only in this response
pub async fn api_key_post(Extension(auth_user): Extension<AuthUser>) -> ApiResult<IssuedApiKey> {
    let pool = DatabaseManager::pool().await?;
    let issued = SettingsService::new(pool).rotate_api_key(auth_user.id).await?;
    Ok(ApiResponse::created(issued))
}
