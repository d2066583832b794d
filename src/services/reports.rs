use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Report, ReportListing};
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report not found.")]
    NotFound,

    #[error("Report is not ready.")]
    NotReady,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotFound => ApiError::not_found(err.to_string()),
            ReportError::NotReady => ApiError::conflict(err.to_string()),
            ReportError::Database(e) => e.into(),
        }
    }
}

/// Where a finished report can be fetched from
pub fn download_target(report: &Report) -> Result<&str, ReportError> {
    report
        .file_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(ReportError::NotReady)
}

pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repository(&self) -> Repository<Report> {
        Repository::new("reports", self.pool.clone())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ReportListing>, DatabaseError> {
        Ok(sqlx::query_as::<_, ReportListing>(
            r#"
            SELECT r.*, p.domain AS audit_domain
            FROM reports r
            JOIN audits a ON a.id = r.audit_id
            JOIN projects p ON p.id = a.project_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_owned(&self, user_id: Uuid, id: Uuid) -> Result<Report, ReportError> {
        self.repository()
            .select_owned(id, "user_id", user_id)
            .await?
            .ok_or(ReportError::NotFound)
    }

    pub async fn download_url(&self, user_id: Uuid, id: Uuid) -> Result<String, ReportError> {
        let report = self.find_owned(user_id, id).await?;
        download_target(&report).map(str::to_string)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ReportError> {
        let deleted = self.repository().delete_owned(id, "user_id", user_id).await?;
        if !deleted {
            return Err(ReportError::NotFound);
        }
        tracing::info!("Deleted report {}", id);
        Ok(())
    }
}
