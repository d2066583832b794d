// handlers/protected/reports/mod.rs - Generated report listing, download and removal

use axum::{
    extract::Path,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ReportService;

/// GET /api/reports - caller's reports newest first
pub async fn report_list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let reports = ReportService::new(pool).list_for_user(auth_user.id).await?;
    Ok(ApiResponse::success(json!({ "reports": reports })))
}

/// GET /api/reports/:id/download - 307 to the stored file, 409 while it is still rendering
pub async fn report_download(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let url = ReportService::new(pool).download_url(auth_user.id, id).await?;

    let location = HeaderValue::from_str(&url).map_err(|_| {
        tracing::error!("Report {} has an unusable file URL", id);
        ApiError::internal_server_error("Report file URL is invalid")
    })?;
    Ok((StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response())
}

/// DELETE /api/reports/:id
pub async fn report_delete(Extension(auth_user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    ReportService::new(pool).delete(auth_user.id, id).await?;
    Ok(ApiResponse::ok())
}
