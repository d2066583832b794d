use axum::{extract::Path, Extension};
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::insights::OffPageSummary;
use crate::services::{AuditService, InsightService};

/// GET /api/audits/:id/off-page
pub async fn audit_off_page(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<OffPageSummary> {
    let pool = DatabaseManager::pool().await?;
    AuditService::new(pool.clone()).find_owned(auth_user.id, id).await?;
    let summary = InsightService::new(pool).off_page_summary(id).await?;
    Ok(ApiResponse::success(summary))
}
