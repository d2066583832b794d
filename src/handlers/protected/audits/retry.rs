use axum::{extract::Path, Extension};
use serde_json::Value;
use uuid::Uuid;

use crate::config;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AuditService, PlanLimits};

/// POST /api/audits/:id/retry - requeue a failed audit
pub async fn audit_retry(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let limits = PlanLimits::new(&config::config().plans, auth_user.is_pro);
    let pool = DatabaseManager::pool().await?;
    AuditService::new(pool).retry(auth_user.id, limits, id).await?;
    Ok(ApiResponse::ok())
}
