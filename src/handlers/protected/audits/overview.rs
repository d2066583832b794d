use axum::{extract::Path, Extension};
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::insights::{fix_key, issue_key, rank_groups, AuditOverview, Scores, TOP_GROUPS};
use crate::services::{AuditService, InsightService};

/// GET /api/audits/:id/overview - scores plus the top issues and fixes
pub async fn audit_overview(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<AuditOverview> {
    let pool = DatabaseManager::pool().await?;
    let audits = AuditService::new(pool.clone());
    let listing = audits.find_owned(auth_user.id, id).await?;

    let issues = InsightService::new(pool).recent_issues(id).await?;
    let report_url = audits.latest_report_url(auth_user.id, id).await?;

    Ok(ApiResponse::success(AuditOverview {
        audit_id: listing.audit.id,
        scores: Scores::from(&listing.audit),
        status: listing.audit.status,
        domain: listing.domain,
        top_issues: rank_groups(&issues, issue_key, TOP_GROUPS),
        top_fixes: rank_groups(&issues, fix_key, TOP_GROUPS),
        report_url,
    }))
}
