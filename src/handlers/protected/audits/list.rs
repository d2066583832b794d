use axum::Extension;
use serde_json::{json, Value};

use super::AUDIT_LIST_LIMIT;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AuditService;

/// GET /api/audits - newest audits run by the caller
pub async fn audit_list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let audits = AuditService::new(pool).list_for_runner(auth_user.id, AUDIT_LIST_LIMIT).await?;
    Ok(ApiResponse::success(json!({ "audits": audits })))
}
