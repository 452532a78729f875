//! History management and the duplicate-URL index.

use crate::error::{Error, Result};
use crate::persistence::HistoryEntry;
use crate::types::Status;

use super::{HistoryRow, SqliteStore};

impl SqliteStore {
    /// Record the terminal outcome of a job
    pub(crate) async fn insert_history(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (
                job_id, source_url, title, uploader, category,
                status, final_path, error_message, size_bytes, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(&entry.uploader)
        .bind(&entry.category)
        .bind(entry.status.to_i32())
        .bind(
            entry
                .final_path
                .as_ref()
                .and_then(|p| p.to_str().map(String::from)),
        )
        .bind(&entry.error)
        .bind(entry.size_bytes as i64)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Whether a URL has a completed download in history
    pub(crate) async fn history_contains(&self, url: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM history WHERE source_url = ? AND status = ?)",
        )
        .bind(url)
        .bind(Status::Completed.to_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(exists)
    }

    /// Query history with pagination, most recent first
    pub async fn query_history(&self, limit: usize, offset: usize) -> Result<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
                id, job_id, source_url, title, uploader, category,
                status, final_path, error_message, size_bytes, completed_at
            FROM history
            ORDER BY completed_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }

    /// Delete history entries older than the specified timestamp
    ///
    /// Returns the number of records deleted.
    pub async fn delete_history_before(&self, before_timestamp: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history WHERE completed_at < ?")
            .bind(before_timestamp)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }
}
