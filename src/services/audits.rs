use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use super::plan::{week_ago, PlanLimits, PlanViolation};
use super::projects::ProjectService;
use crate::database::models::{Audit, AuditListing};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::types::AuditStatus;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit not found.")]
    NotFound,

    #[error("Only failed audits can be retried.")]
    NotRetryable,

    #[error(transparent)]
    Plan(#[from] PlanViolation),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        AuditError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::NotFound => ApiError::not_found(err.to_string()),
            AuditError::NotRetryable => ApiError::bad_request(err.to_string()),
            AuditError::Plan(e) => e.into(),
            AuditError::Database(e) => e.into(),
        }
    }
}

/// Usage counters the plan checks run against
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditUsage {
    pub projects: i64,
    pub domain_already_owned: bool,
    pub audits_last_week: i64,
    pub active_audits: i64,
    pub last_audit_at: Option<DateTime<Utc>>,
}

/// Order matters: plan limits (403) are reported before throttling (429)
pub fn check_new_audit(limits: &PlanLimits<'_>, usage: &AuditUsage, now: DateTime<Utc>) -> Result<(), PlanViolation> {
    limits.check_new_project(usage.projects, usage.domain_already_owned)?;
    limits.check_weekly_audits(usage.audits_last_week)?;
    limits.check_cooldown(usage.last_audit_at, now)?;
    limits.check_concurrency(usage.active_audits)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAudit {
    pub id: Uuid,
    pub project_id: Uuid,
}

/// Polling view of a running audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatusView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub domain: String,
    pub status: AuditStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_crawled: i32,
    pub plan_limit_pages: i32,
    pub issues_found: i32,
    pub progress: AuditProgress,
    pub last_error: Option<String>,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditProgress {
    pub crawl: i32,
    pub performance: i32,
    pub analysis: i32,
    pub report: i32,
}

impl From<AuditListing> for AuditStatusView {
    fn from(listing: AuditListing) -> Self {
        let audit = listing.audit;
        Self {
            id: audit.id,
            project_id: audit.project_id,
            domain: listing.domain,
            status: audit.status,
            started_at: audit.started_at,
            completed_at: audit.completed_at,
            pages_crawled: audit.pages_crawled,
            plan_limit_pages: audit.plan_limit_pages,
            issues_found: audit.issues_found,
            progress: AuditProgress {
                crawl: audit.progress_crawl,
                performance: audit.progress_performance,
                analysis: audit.progress_analysis,
                report: audit.progress_report,
            },
            last_error: audit.last_error,
            can_retry: audit.status == AuditStatus::Failed,
        }
    }
}

const LISTING_SELECT: &str = r#"
    SELECT a.*, p.name AS project_name, p.domain
    FROM audits a
    JOIN projects p ON p.id = a.project_id
"#;

pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_runner(&self, runner_id: Uuid, limit: i64) -> Result<Vec<AuditListing>, DatabaseError> {
        let query = format!("{} WHERE a.runner_id = $1 ORDER BY a.created_at DESC LIMIT $2", LISTING_SELECT);
        Ok(sqlx::query_as::<_, AuditListing>(&query)
            .bind(runner_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Audit visible to `runner_id`, or `NotFound`
    pub async fn find_owned(&self, runner_id: Uuid, id: Uuid) -> Result<AuditListing, AuditError> {
        let query = format!("{} WHERE a.id = $1 AND a.runner_id = $2", LISTING_SELECT);
        sqlx::query_as::<_, AuditListing>(&query)
            .bind(id)
            .bind(runner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuditError::NotFound)
    }

    /// Counters for `runner_id`; run after `ProjectService::lock_owner` in the same transaction
    async fn usage_in(
        conn: &mut PgConnection,
        runner_id: Uuid,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<AuditUsage, sqlx::Error> {
        let (projects, domain_already_owned) = ProjectService::ownership_in(&mut *conn, runner_id, domain).await?;
        let (audits_last_week, active_audits, last_audit_at) = sqlx::query_as::<_, (i64, i64, Option<DateTime<Utc>>)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at >= $2),
                COUNT(*) FILTER (WHERE status IN ('PENDING', 'RUNNING')),
                MAX(created_at)
            FROM audits
            WHERE runner_id = $1
            "#,
        )
        .bind(runner_id)
        .bind(week_ago(now))
        .fetch_one(&mut *conn)
        .await?;

        Ok(AuditUsage {
            projects,
            domain_already_owned,
            audits_last_week,
            active_audits,
            last_audit_at,
        })
    }

    /// Queue an audit for `domain` (already normalized), creating or renaming its project
    pub async fn create(
        &self,
        runner_id: Uuid,
        limits: PlanLimits<'_>,
        name: &str,
        domain: &str,
    ) -> Result<CreatedAudit, AuditError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        ProjectService::lock_owner(&mut tx, runner_id).await?;
        let usage = Self::usage_in(&mut tx, runner_id, domain, now).await?;
        if let Err(violation) = check_new_audit(&limits, &usage, now) {
            tracing::warn!("Audit for {} refused for user {}: {}", domain, runner_id, violation);
            return Err(violation.into());
        }

        let project = ProjectService::upsert_in(&mut tx, runner_id, name, domain).await?;
        let audit = sqlx::query_as::<_, Audit>(
            r#"
            INSERT INTO audits (id, project_id, runner_id, status, plan_at_run, plan_limit_pages)
            VALUES ($1, $2, $3, 'PENDING', $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project.id)
        .bind(runner_id)
        .bind(limits.plan())
        .bind(limits.pages_per_crawl())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Queued audit {} for {} ({:?})", audit.id, domain, audit.plan_at_run);
        Ok(CreatedAudit {
            id: audit.id,
            project_id: project.id,
        })
    }

    /// Put a failed audit back in the queue with its progress cleared
    pub async fn retry(&self, runner_id: Uuid, limits: PlanLimits<'_>, id: Uuid) -> Result<(), AuditError> {
        let listing = self.find_owned(runner_id, id).await?;
        if listing.audit.status != AuditStatus::Failed {
            return Err(AuditError::NotRetryable);
        }

        let mut tx = self.pool.begin().await?;
        ProjectService::lock_owner(&mut tx, runner_id).await?;
        let active = Self::usage_in(&mut tx, runner_id, &listing.domain, Utc::now())
            .await?
            .active_audits;
        limits.check_concurrency(active)?;

        let result = sqlx::query(
            r#"
            UPDATE audits SET
                status = 'PENDING',
                progress_crawl = 0,
                progress_performance = 0,
                progress_analysis = 0,
                progress_report = 0,
                last_error = NULL,
                started_at = NULL,
                completed_at = NULL,
                updated_at = now()
            WHERE id = $1 AND runner_id = $2 AND status = 'FAILED'
            "#,
        )
        .bind(id)
        .bind(runner_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Picked up by someone else between the read and the update
            return Err(AuditError::NotRetryable);
        }
        tx.commit().await?;
        tracing::info!("Audit {} queued for retry", id);
        Ok(())
    }

    /// Newest report the caller generated for this audit
    pub async fn latest_report_url(&self, user_id: Uuid, audit_id: Uuid) -> Result<Option<String>, DatabaseError> {
        Ok(sqlx::query_scalar::<_, Option<String>>(
            "SELECT file_url FROM reports WHERE audit_id = $1 AND user_id = $2 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(audit_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanConfig;
    use chrono::Duration;

    fn config() -> PlanConfig {
        PlanConfig {
            free_max_projects: 1,
            free_audits_per_week: 1,
            free_pages_per_crawl: 10,
            pro_pages_per_crawl: 100,
            free_max_active_audits: 1,
            pro_max_active_audits: 3,
            audit_cooldown_secs: 60,
        }
    }

    #[test]
    fn first_audit_is_allowed() {
        let config = config();
        let limits = PlanLimits::new(&config, false);
        assert!(check_new_audit(&limits, &AuditUsage::default(), Utc::now()).is_ok());
    }

    #[test]
    fn free_user_second_domain_is_a_plan_error() {
        let config = config();
        let limits = PlanLimits::new(&config, false);
        let usage = AuditUsage {
            projects: 1,
            ..Default::default()
        };
        assert_eq!(check_new_audit(&limits, &usage, Utc::now()), Err(PlanViolation::ProjectLimit));
    }

    #[test]
    fn weekly_limit_wins_over_cooldown() {
        let config = config();
        let limits = PlanLimits::new(&config, false);
        let now = Utc::now();
        let usage = AuditUsage {
            projects: 1,
            domain_already_owned: true,
            audits_last_week: 1,
            active_audits: 0,
            last_audit_at: Some(now - Duration::seconds(5)),
        };
        assert_eq!(check_new_audit(&limits, &usage, now), Err(PlanViolation::WeeklyAuditLimit));
    }

    #[test]
    fn pro_user_is_throttled_not_limited() {
        let config = config();
        let limits = PlanLimits::new(&config, true);
        let now = Utc::now();
        let recent = AuditUsage {
            projects: 9,
            audits_last_week: 30,
            last_audit_at: Some(now - Duration::seconds(10)),
            ..Default::default()
        };
        assert!(matches!(check_new_audit(&limits, &recent, now), Err(PlanViolation::Cooldown { .. })));

        let busy = AuditUsage {
            active_audits: 3,
            last_audit_at: Some(now - Duration::minutes(5)),
            ..recent
        };
        assert_eq!(check_new_audit(&limits, &busy, now), Err(PlanViolation::ConcurrencyLimit));
    }

    #[test]
    fn audit_errors_map_to_statuses() {
        let err: ApiError = AuditError::NotRetryable.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Only failed audits can be retried.");
        let err: ApiError = AuditError::NotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
