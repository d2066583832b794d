use axum::Extension;

use crate::config;
use crate::database::DatabaseManager;
use crate::handlers::protected::projects::SiteRequest;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::audits::CreatedAudit;
use crate::services::{AuditService, PlanLimits};

/// POST /api/audits - queue an audit, creating the project on first use
///
/// Plan limits answer 403, cooldown and concurrency answer 429.
pub async fn audit_create(
    Extension(auth_user): Extension<AuthUser>,
    Payload(body): Payload<SiteRequest>,
) -> ApiResult<CreatedAudit> {
    let (name, domain) = body.validate()?;
    let limits = PlanLimits::new(&config::config().plans, auth_user.is_pro);

    let pool = DatabaseManager::pool().await?;
    let created = AuditService::new(pool).create(auth_user.id, limits, &name, &domain).await?;
    Ok(ApiResponse::created(created))
}
