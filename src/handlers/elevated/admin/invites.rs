use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::invites::{NewInvite, DEFAULT_EXPIRY_DAYS, MAX_EXPIRY_DAYS};
use crate::services::validation::validate_email;
use crate::services::InviteService;
use crate::types::Role;

/// Invites shown on the invite page
pub const INVITE_LIST_LIMIT: i64 = 100;

/// GET /api/invites
pub async fn invite_list() -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let invites = InviteService::new(pool).list(INVITE_LIST_LIMIT).await?;
    Ok(ApiResponse::success(json!({ "invites": invites })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub role: Role,
    pub expires_in_days: Option<i64>,
}

impl CreateInviteRequest {
    pub fn validate(self) -> Result<NewInvite, ApiError> {
        let email = match self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => Some(validate_email("email", email)?),
            None => None,
        };
        let expires_in_days = self.expires_in_days.unwrap_or(DEFAULT_EXPIRY_DAYS);
        if !(1..=MAX_EXPIRY_DAYS).contains(&expires_in_days) {
            return Err(ApiError::invalid_field(
                "expiresInDays",
                format!("must be between 1 and {}", MAX_EXPIRY_DAYS),
            ));
        }
        Ok(NewInvite {
            email,
            is_pro: self.is_pro,
            role: self.role,
            expires_in_days,
        })
    }
}

/// POST /api/invites - mint a single-use sign-up token
pub async fn invite_create(
    Extension(admin): Extension<AuthUser>,
    Payload(body): Payload<CreateInviteRequest>,
) -> ApiResult<Value> {
    let invite = body.validate()?;

    let pool = DatabaseManager::pool().await?;
    let created = InviteService::new(pool).create(invite, Some(admin.id)).await?;

    Ok(ApiResponse::created(json!({
        "token": created.token,
        "expiresAt": created.expires_at,
        "email": created.email,
        "isPro": created.is_pro,
        "role": created.role,
    })))
}
