use axum::{extract::Path, Extension};
use serde_json::Value;
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ProjectService;

/// DELETE /api/projects/:id - remove the project with all of its audits
pub async fn project_delete(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    ProjectService::new(pool).delete(auth_user.id, id).await?;
    Ok(ApiResponse::ok())
}
