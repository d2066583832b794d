use axum::{extract::Path, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::password::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use crate::auth::SESSION_CACHE;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::accounts::{NewUser, UserPatch};
use crate::services::validation::{optional_name, validate_email, validate_len};
use crate::services::AccountService;
use crate::types::{Role, UserStatus};

/// GET /api/admin/users - every user, newest first
pub async fn user_list() -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let users = AccountService::new(pool).list_users().await?;
    Ok(ApiResponse::success(json!({ "users": users })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_pro: bool,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let password = match self.password.filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_len("password", &password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)?;
                Some(password)
            }
            None => None,
        };
        Ok(NewUser {
            name: optional_name("name", self.name.as_deref(), 2, 120)?,
            email: validate_email("email", &self.email)?,
            password,
            role: self.role,
            is_pro: self.is_pro,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_pro: bool,
    /// Present only when the admin left the password blank
    pub temp_password: Option<String>,
}

/// POST /api/admin/users - create a user directly, bypassing invites and the signup switch
pub async fn user_create(
    Extension(admin): Extension<AuthUser>,
    Payload(body): Payload<CreateUserRequest>,
) -> ApiResult<CreatedUser> {
    let new_user = body.validate()?;

    let pool = DatabaseManager::pool().await?;
    let (user, temp_password) = AccountService::new(pool).create_user(new_user).await?;
    tracing::info!("Super-admin {} created user {}", admin.id, user.id);

    Ok(ApiResponse::created(CreatedUser {
        id: user.id,
        email: user.email,
        role: user.role,
        is_pro: user.is_pro,
        temp_password,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub is_pro: Option<bool>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserPatch, ApiError> {
        if let Some(password) = &self.password {
            validate_len("password", password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)?;
        }
        Ok(UserPatch {
            name: optional_name("name", self.name.as_deref(), 2, 120)?,
            role: self.role,
            status: self.status,
            is_pro: self.is_pro,
            password: self.password,
        })
    }
}

/// PATCH /api/admin/users/:id - role, plan, status or password changes take effect on the next request
pub async fn user_update(
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Payload(body): Payload<UpdateUserRequest>,
) -> ApiResult<Value> {
    let patch = body.validate()?;

    let pool = DatabaseManager::pool().await?;
    let user = AccountService::new(pool).update_user(id, patch).await?;
    SESSION_CACHE.evict_user(user.id).await;
    tracing::info!("Super-admin {} updated user {}", admin.id, user.id);

    Ok(ApiResponse::success(json!({
        "id": user.id,
        "email": user.email,
        "role": user.role,
        "status": user.status,
        "isPro": user.is_pro,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_to_free_user() {
        let body: CreateUserRequest = serde_json::from_value(json!({ "email": "Staff@Example.com" })).unwrap();
        let new_user = body.validate().unwrap();
        assert_eq!(new_user.role, Role::User);
        assert!(!new_user.is_pro);
        assert!(new_user.password.is_none());
        assert_eq!(new_user.email, "staff@example.com");
    }

    #[test]
    fn unknown_role_is_rejected_by_serde() {
        let parsed = serde_json::from_value::<CreateUserRequest>(json!({ "email": "a@b.co", "role": "OWNER" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_patch_passes_validation_but_is_empty() {
        let patch = UpdateUserRequest::default().validate().unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn short_patch_password_is_rejected() {
        let body = UpdateUserRequest {
            password: Some("short".to_string()),
            ..Default::default()
        };
        assert_eq!(body.validate().unwrap_err().status_code(), 400);
    }
}
