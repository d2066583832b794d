use axum::Extension;
use serde_json::{json, Value};

use super::SiteRequest;
use crate::config;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::{PlanLimits, ProjectService};

/// POST /api/projects - add a domain, subject to the plan's project limit
pub async fn project_create(
    Extension(auth_user): Extension<AuthUser>,
    Payload(body): Payload<SiteRequest>,
) -> ApiResult<Value> {
    let (name, domain) = body.validate()?;
    let limits = PlanLimits::new(&config::config().plans, auth_user.is_pro);

    let pool = DatabaseManager::pool().await?;
    let service = ProjectService::new(pool);
    let project = service.create(auth_user.id, limits, &name, &domain).await?;
    let projects = service.list_with_last_audit(auth_user.id).await?;

    Ok(ApiResponse::created(json!({ "projectId": project.id, "projects": projects })))
}
