use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{AuditStatus, Plan};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: Uuid,
    pub project_id: Uuid,
    pub runner_id: Uuid,
    pub status: AuditStatus,
    pub plan_at_run: Plan,
    pub plan_limit_pages: i32,
    pub pages_crawled: i32,
    pub issues_found: i32,
    pub score_overall: Option<i32>,
    pub score_performance: Option<i32>,
    pub score_on_page: Option<i32>,
    pub score_technical: Option<i32>,
    pub score_off_page: Option<i32>,
    pub progress_crawl: i32,
    pub progress_performance: i32,
    pub progress_analysis: i32,
    pub progress_report: i32,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An audit joined with the project it ran against.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub project_name: String,
    pub domain: String,
}
