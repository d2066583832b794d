use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{IssueCategory, Severity};

/// A finding written by the audit worker. `page_url` comes from a join on `pages`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub page_id: Option<Uuid>,
    pub page_url: Option<String>,
    pub category: IssueCategory,
    pub severity: Severity,
    pub rule_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub fix: Option<String>,
    pub created_at: DateTime<Utc>,
}
