use axum::Extension;
use serde_json::{json, Value};

use crate::config;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::plan::plan_summary;
use crate::types::Plan;

/// GET /api/plans - plan comparison and who to contact for an upgrade
pub async fn plans_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let config = config::config();
    Ok(ApiResponse::success(json!({
        "currentPlan": Plan::for_user(auth_user.is_pro),
        "plans": [
            plan_summary(&config.plans, Plan::Free),
            plan_summary(&config.plans, Plan::Pro),
        ],
        "contactEmail": config.admin.super_admin_email,
    })))
}
