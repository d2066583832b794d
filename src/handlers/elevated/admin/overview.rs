use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, InviteService};

const OVERVIEW_INVITES: i64 = 50;

/// GET /api/admin/overview - users and recent invites for the console landing page
pub async fn overview_get() -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let users = AccountService::new(pool.clone()).list_users().await?;
    let invites = InviteService::new(pool).list(OVERVIEW_INVITES).await?;
    Ok(ApiResponse::success(json!({ "users": users, "invites": invites })))
}
