use axum::Extension;
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::dashboard::IssueTotals;
use crate::services::DashboardService;

/// GET /api/issues/summary - issue counts per category over all of the caller's audits
pub async fn issue_summary_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<IssueTotals> {
    let pool = DatabaseManager::pool().await?;
    let totals = DashboardService::new(pool).issue_totals(auth_user.id).await?;
    Ok(ApiResponse::success(totals))
}

/// GET /api/overview/latest - `{auditId: null}` until the caller runs an audit
pub async fn latest_audit_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let audit_id = DashboardService::new(pool).latest_audit_id(auth_user.id).await?;
    Ok(ApiResponse::success(json!({ "auditId": audit_id })))
}
