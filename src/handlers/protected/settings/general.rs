use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::SESSION_CACHE;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::settings::{BrandingUpdate, NotificationUpdate};
use crate::services::validation::optional_name;
use crate::services::{AccountService, SettingsService};

/// GET /api/settings - `{settings: null}` until the user saves something
pub async fn settings_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let settings = SettingsService::new(pool).get(auth_user.id).await?;
    Ok(ApiResponse::success(json!({ "settings": settings })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub profile: Option<ProfileUpdate>,
    pub branding: Option<BrandingUpdate>,
    pub notifications: Option<NotificationUpdate>,
}

impl SettingsRequest {
    /// Checks lengths and the Pro gate before anything is written
    pub fn validate(&self, is_pro: bool) -> Result<Option<String>, ApiError> {
        let name = match &self.profile {
            Some(profile) => optional_name("name", profile.name.as_deref(), 2, 120)?,
            None => None,
        };
        if let Some(branding) = &self.branding {
            branding.validate(is_pro)?;
        }
        Ok(name)
    }
}

/// PUT /api/settings - partial update of profile name, branding and notifications
pub async fn settings_put(
    Extension(auth_user): Extension<AuthUser>,
    Payload(body): Payload<SettingsRequest>,
) -> ApiResult<Value> {
    let name = body.validate(auth_user.is_pro)?;

    let pool = DatabaseManager::pool().await?;
    if let Some(name) = name {
        AccountService::new(pool.clone()).update_name(auth_user.id, &name).await?;
        SESSION_CACHE.evict_user(auth_user.id).await;
    }
    if body.branding.is_some() || body.notifications.is_some() {
        let branding = body.branding.unwrap_or_default();
        let notifications = body.notifications.unwrap_or_default();
        SettingsService::new(pool)
            .update(auth_user.id, &branding, &notifications)
            .await?;
    }

    Ok(ApiResponse::ok())
}
