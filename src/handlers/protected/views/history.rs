use axum::{extract::Query, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::insights::{compare, Comparison, HistoryFilters};
use crate::services::InsightService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub domain: Option<String>,
    pub min_score: Option<String>,
    pub max_score: Option<String>,
}

fn parse_score(field: &str, raw: Option<&str>) -> Result<Option<i32>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| ApiError::invalid_field(field, "must be a whole number")),
        None => Ok(None),
    }
}

impl HistoryQuery {
    pub fn parse(self) -> Result<HistoryFilters, ApiError> {
        Ok(HistoryFilters {
            min_score: parse_score("minScore", self.min_score.as_deref())?,
            max_score: parse_score("maxScore", self.max_score.as_deref())?,
            domain: self.domain,
        })
    }
}

/// GET /api/history - past audits with domain and score filters
pub async fn history_get(Extension(auth_user): Extension<AuthUser>, Query(query): Query<HistoryQuery>) -> ApiResult<Value> {
    let filters = query.parse()?;
    let pool = DatabaseManager::pool().await?;
    let audits = InsightService::new(pool).history(auth_user.id, &filters).await?;
    Ok(ApiResponse::success(json!({ "audits": audits })))
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub first: Uuid,
    pub second: Uuid,
}

/// GET /api/history/compare - two audits side by side with the score delta
pub async fn history_compare(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<Comparison> {
    let pool = DatabaseManager::pool().await?;
    let insights = InsightService::new(pool);
    let not_found = || ApiError::not_found("Audit not found.");

    let first = insights.history_entry(auth_user.id, query.first).await?.ok_or_else(not_found)?;
    let second = insights.history_entry(auth_user.id, query.second).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(compare(first, second)))
}
