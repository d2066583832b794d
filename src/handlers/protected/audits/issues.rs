use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::insights::{group_category_issues, CategoryIssues, IssueFilters};
use crate::services::{AuditService, InsightService};
use crate::types::{IssueCategory, Severity};

#[derive(Debug, Default, Deserialize)]
pub struct IssuesQuery {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub page: Option<String>,
    pub search: Option<String>,
}

impl IssuesQuery {
    pub fn parse(self) -> Result<(IssueCategory, IssueFilters), ApiError> {
        let category = self
            .category
            .as_deref()
            .and_then(IssueCategory::from_slug)
            .ok_or_else(|| ApiError::invalid_field("category", "must be technical, on-page, off-page or performance"))?;

        let severity = match self.severity.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(Severity::parse(raw).ok_or_else(|| ApiError::invalid_field("severity", "unknown severity"))?),
            None => None,
        };

        let filters = IssueFilters {
            severity,
            page_url: self.page.filter(|p| !p.trim().is_empty()),
            search: self.search,
        };
        Ok((category, filters))
    }
}

/// GET /api/audits/:id/issues - one category's findings in display groups
pub async fn audit_issues(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<IssuesQuery>,
) -> ApiResult<CategoryIssues> {
    let (category, filters) = query.parse()?;

    let pool = DatabaseManager::pool().await?;
    AuditService::new(pool.clone()).find_owned(auth_user.id, id).await?;
    let issues = InsightService::new(pool).category_issues(id, category).await?;

    Ok(ApiResponse::success(group_category_issues(category, issues, &filters)))
}
