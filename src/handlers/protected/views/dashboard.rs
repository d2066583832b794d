use axum::Extension;

use crate::config;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::dashboard::Dashboard;
use crate::services::DashboardService;

/// GET /api/dashboard - usage counts and the caller's plan lines
pub async fn dashboard_get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Dashboard> {
    let pool = DatabaseManager::pool().await?;
    let dashboard = DashboardService::new(pool)
        .dashboard(auth_user.id, auth_user.is_pro, &config::config().plans)
        .await?;
    Ok(ApiResponse::success(dashboard))
}
