// handlers/public/auth/providers.rs - GET /auth/providers handler

use serde_json::{json, Value};

use crate::config;
use crate::middleware::{ApiResponse, ApiResult};

/// Which sign-in buttons the client should render
pub async fn providers_get() -> ApiResult<Value> {
    let google = config::config().oauth.google_enabled();
    Ok(ApiResponse::success(json!({ "credentials": true, "google": google })))
}
