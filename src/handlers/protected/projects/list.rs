use axum::Extension;
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ProjectService;

/// GET /api/projects - caller's projects newest first, each with its latest audit
pub async fn project_list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let projects = ProjectService::new(pool).list_with_last_audit(auth_user.id).await?;
    Ok(ApiResponse::success(json!({ "projects": projects })))
}
