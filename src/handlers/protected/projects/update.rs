use axum::{extract::Path, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Payload};
use crate::services::domain::{normalize_domain, HttpProbe};
use crate::services::projects::ProjectPatch;
use crate::services::validation::{optional_name, validate_len};
use crate::services::ProjectService;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub action: Option<String>,
}

impl ProjectUpdateRequest {
    pub fn validate(self) -> Result<ProjectPatch, ApiError> {
        let name = optional_name("name", self.name.as_deref(), 2, 120)?;
        let domain = match self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => {
                validate_len("domain", domain, 3, 190)?;
                Some(normalize_domain(domain)?)
            }
            None => None,
        };
        let verify = match self.action.as_deref() {
            None => false,
            Some("verify") => true,
            Some(_) => return Err(ApiError::invalid_field("action", "must be \"verify\"")),
        };
        Ok(ProjectPatch { name, domain, verify })
    }
}

/// PATCH /api/projects/:id - rename, move to a new domain, and/or verify
pub async fn project_update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Payload(body): Payload<ProjectUpdateRequest>,
) -> ApiResult<Value> {
    let patch = body.validate()?;
    let deadline = Duration::from_secs(config::config().api.verification_timeout_secs);
    let probe = HttpProbe::new().map_err(|e| {
        tracing::error!("Failed to build verification client: {}", e);
        ApiError::internal_server_error("Verification unavailable")
    })?;

    let pool = DatabaseManager::pool().await?;
    ProjectService::new(pool)
        .update(auth_user.id, id, patch, &probe, deadline)
        .await?;

    Ok(ApiResponse::success(json!({ "ok": true, "message": "Project updated." })))
}
