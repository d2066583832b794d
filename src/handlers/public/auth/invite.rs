// handlers/public/auth/invite.rs - GET /auth/invites/:token handler

use axum::extract::Path;

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::invites::InvitePreview;
use crate::services::InviteService;

/// Lets the sign-up page show who an invite is for before submitting
pub async fn invite_get(Path(token): Path<String>) -> ApiResult<InvitePreview> {
    let pool = DatabaseManager::pool().await?;
    let preview = InviteService::new(pool).preview(token.trim()).await?;
    Ok(ApiResponse::success(preview))
}
