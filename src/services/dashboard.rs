use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::plan::{plan_summary, PlanSummary};
use crate::config::PlanConfig;
use crate::database::DatabaseError;
use crate::types::Plan;

#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    pub projects: i64,
    pub audits: i64,
    pub reports: i64,
}

/// Issues found across all of a user's audits, per category
#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssueTotals {
    pub technical: i64,
    pub on_page: i64,
    pub off_page: i64,
    pub performance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub counts: UsageCounts,
    pub plan: Plan,
    pub plan_summary: PlanSummary,
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn counts(&self, user_id: Uuid) -> Result<UsageCounts, DatabaseError> {
        Ok(sqlx::query_as::<_, UsageCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects WHERE owner_id = $1) AS projects,
                (SELECT COUNT(*) FROM audits WHERE runner_id = $1) AS audits,
                (SELECT COUNT(*) FROM reports WHERE user_id = $1) AS reports
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn issue_totals(&self, user_id: Uuid) -> Result<IssueTotals, DatabaseError> {
        Ok(sqlx::query_as::<_, IssueTotals>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE i.category = 'TECHNICAL') AS technical,
                COUNT(*) FILTER (WHERE i.category = 'ON_PAGE') AS on_page,
                COUNT(*) FILTER (WHERE i.category = 'OFF_PAGE') AS off_page,
                COUNT(*) FILTER (WHERE i.category = 'PERFORMANCE') AS performance
            FROM issues i
            JOIN audits a ON a.id = i.audit_id
            WHERE a.runner_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Newest audit the user ran, if any
    pub async fn latest_audit_id(&self, user_id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM audits WHERE runner_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn dashboard(&self, user_id: Uuid, is_pro: bool, config: &PlanConfig) -> Result<Dashboard, DatabaseError> {
        let plan = Plan::for_user(is_pro);
        Ok(Dashboard {
            counts: self.counts(user_id).await?,
            plan,
            plan_summary: plan_summary(config, plan),
        })
    }
}
