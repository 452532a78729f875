//! Queue record CRUD operations.

use crate::error::{Error, Result};
use crate::persistence::{JobRecord, StatusDetail};
use crate::types::{JobId, Status};

use super::{JobRow, SqliteStore};

impl SqliteStore {
    /// Insert a newly accepted job record
    pub(crate) async fn insert_job(&self, record: &JobRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, url, destination, format_hint, category,
                priority, status, progress, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(&record.url)
        .bind(&record.destination)
        .bind(&record.format_hint)
        .bind(&record.category)
        .bind(record.priority)
        .bind(Status::Pending.to_i32())
        .bind(0.0f32)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Update a job's status and any accompanying detail fields
    pub(crate) async fn update_job_status(
        &self,
        id: JobId,
        status: Status,
        detail: &StatusDetail,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET
                status = ?,
                progress = COALESCE(?, progress),
                error_message = COALESCE(?, error_message),
                started_at = COALESCE(?, started_at),
                completed_at = COALESCE(?, completed_at)
            WHERE id = ?
            "#,
        )
        .bind(status.to_i32())
        .bind(detail.progress)
        .bind(&detail.error)
        .bind(detail.started_at)
        .bind(detail.completed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Get a job record by ID
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                id, url, destination, format_hint, category, priority,
                status, progress, error_message, created_at, started_at, completed_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// List all job records, highest priority first, FIFO within priority
    pub async fn list_jobs(&self) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                id, url, destination, format_hint, category, priority,
                status, progress, error_message, created_at, started_at, completed_at
            FROM jobs
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }

    /// List job records with a specific status
    pub async fn list_jobs_by_status(&self, status: Status) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                id, url, destination, format_hint, category, priority,
                status, progress, error_message, created_at, started_at, completed_at
            FROM jobs
            WHERE status = ?
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(status.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }
}
