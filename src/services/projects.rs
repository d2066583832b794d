use chrono::Utc;
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::domain::{verify_domain, DomainProbe, VERIFICATION_FAILED_MESSAGE};
use super::plan::{PlanLimits, PlanViolation};
use crate::database::models::{LastAudit, Project};
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::types::VerificationStatus;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project not found.")]
    NotFound,

    #[error("Domain already exists in your projects.")]
    DuplicateDomain,

    #[error("No changes provided.")]
    NoChanges,

    #[error(transparent)]
    Plan(#[from] PlanViolation),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ProjectError {
    fn from(err: sqlx::Error) -> Self {
        ProjectError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound => ApiError::not_found(err.to_string()),
            ProjectError::DuplicateDomain => ApiError::conflict(err.to_string()),
            ProjectError::NoChanges => ApiError::bad_request(err.to_string()),
            ProjectError::Plan(e) => e.into(),
            ProjectError::Database(e) => e.into(),
        }
    }
}

/// Project row plus its newest audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub is_active: bool,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<chrono::DateTime<Utc>>,
    pub verification_error: Option<String>,
    pub last_audit: Option<LastAudit>,
}

/// Already validated and normalized PATCH input
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub verify: bool,
}

pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repository(&self) -> Repository<Project> {
        Repository::new("projects", self.pool.clone())
    }

    pub async fn find_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Project, ProjectError> {
        self.repository()
            .select_owned(id, "owner_id", owner_id)
            .await?
            .ok_or(ProjectError::NotFound)
    }

    /// Row-locks the owner so concurrent creations run their plan checks one at a time
    pub async fn lock_owner(conn: &mut PgConnection, owner_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(owner_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Number of projects the owner has, and whether `domain` is one of them
    pub async fn ownership_in(conn: &mut PgConnection, owner_id: Uuid, domain: &str) -> Result<(i64, bool), sqlx::Error> {
        sqlx::query_as::<_, (i64, bool)>(
            "SELECT COUNT(*), COALESCE(BOOL_OR(domain = $2), FALSE) FROM projects WHERE owner_id = $1",
        )
        .bind(owner_id)
        .bind(domain)
        .fetch_one(conn)
        .await
    }

    pub async fn list_with_last_audit(&self, owner_id: Uuid) -> Result<Vec<ProjectOverview>, DatabaseError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let last_audits = sqlx::query_as::<_, LastAudit>(
            r#"
            SELECT DISTINCT ON (a.project_id)
                a.id, a.project_id, a.status, a.score_overall, a.issues_found, a.created_at, a.completed_at
            FROM audits a
            JOIN projects p ON p.id = a.project_id
            WHERE p.owner_id = $1
            ORDER BY a.project_id, a.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects
            .into_iter()
            .map(|project| {
                let last_audit = last_audits.iter().find(|a| a.project_id == project.id).cloned();
                ProjectOverview {
                    id: project.id,
                    name: project.name,
                    domain: project.domain,
                    is_active: project.is_active,
                    verification_status: project.verification_status,
                    verified_at: project.verified_at,
                    verification_error: project.verification_error,
                    last_audit,
                }
            })
            .collect())
    }

    /// New project; `domain` must already be normalized
    pub async fn create(
        &self,
        owner_id: Uuid,
        limits: PlanLimits<'_>,
        name: &str,
        domain: &str,
    ) -> Result<Project, ProjectError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_owner(&mut tx, owner_id).await?;
        let (count, already_owned) = Self::ownership_in(&mut tx, owner_id, domain).await?;
        limits.check_new_project(count, already_owned)?;
        if already_owned {
            return Err(ProjectError::DuplicateDomain);
        }

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, owner_id, name, domain)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(domain)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ProjectError::DuplicateDomain,
            _ => e.into(),
        })?;
        tx.commit().await?;

        tracing::info!("Created project {} for {}", project.id, project.domain);
        Ok(project)
    }

    /// Insert or rename the owner's project for `domain`, inside an audit-creation transaction
    pub async fn upsert_in(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        name: &str,
        domain: &str,
    ) -> Result<Project, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, owner_id, name, domain)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id, domain) DO UPDATE SET name = EXCLUDED.name, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(domain)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: ProjectPatch,
        probe: &dyn DomainProbe,
        deadline: std::time::Duration,
    ) -> Result<Project, ProjectError> {
        let mut project = self.find_owned(owner_id, id).await?;

        let name = patch.name.filter(|n| *n != project.name);
        let domain = patch.domain.filter(|d| *d != project.domain);
        if name.is_none() && domain.is_none() && !patch.verify {
            return Err(ProjectError::NoChanges);
        }

        if let Some(domain) = &domain {
            let clash = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM projects WHERE owner_id = $1 AND domain = $2 AND id <> $3)",
            )
            .bind(owner_id)
            .bind(domain)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            if clash {
                return Err(ProjectError::DuplicateDomain);
            }
        }

        if name.is_some() || domain.is_some() {
            // A new domain has not been verified yet
            project = sqlx::query_as::<_, Project>(
                r#"
                UPDATE projects SET
                    name = COALESCE($2, name),
                    domain = COALESCE($3, domain),
                    verification_status = CASE WHEN $3::text IS NULL THEN verification_status ELSE 'PENDING' END,
                    verified_at = CASE WHEN $3::text IS NULL THEN verified_at ELSE NULL END,
                    verification_error = CASE WHEN $3::text IS NULL THEN verification_error ELSE NULL END,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(&name)
            .bind(&domain)
            .fetch_one(&self.pool)
            .await?;
        }

        if patch.verify {
            let outcome = verify_domain(probe, &project.domain, deadline).await;
            let (status, error) = if outcome.reachable {
                (VerificationStatus::Verified, None)
            } else {
                (VerificationStatus::Failed, Some(VERIFICATION_FAILED_MESSAGE))
            };
            project = sqlx::query_as::<_, Project>(
                r#"
                UPDATE projects SET
                    verification_status = $2,
                    verified_at = CASE WHEN $2 = 'VERIFIED'::verification_status THEN now() ELSE NULL END,
                    verification_error = $3,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(status)
            .bind(error)
            .fetch_one(&self.pool)
            .await?;
            tracing::info!("Verification of {} finished: {:?}", project.domain, status);
        }

        Ok(project)
    }

    /// Removes the project with its audits and everything hanging off them
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), ProjectError> {
        self.find_owned(owner_id, id).await?;

        let mut tx = self.pool.begin().await?;
        let audit_scope = "SELECT id FROM audits WHERE project_id = $1";
        for table in ["issues", "pages", "reports"] {
            let query = format!("DELETE FROM {} WHERE audit_id IN ({})", table, audit_scope);
            sqlx::query(&query).bind(id).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM audits WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Deleted project {} and its audits", id);
        Ok(())
    }
}
