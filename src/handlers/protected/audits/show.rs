use axum::{extract::Path, Extension};
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::audits::AuditStatusView;
use crate::services::AuditService;

/// GET /api/audits/:id - progress view polled while the worker runs
pub async fn audit_show(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<AuditStatusView> {
    let pool = DatabaseManager::pool().await?;
    let listing = AuditService::new(pool).find_owned(auth_user.id, id).await?;
    Ok(ApiResponse::success(AuditStatusView::from(listing)))
}
