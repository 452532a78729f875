//! Bundled SQLite implementation of the persistence collaborator
//!
//! Handles durable records of queued/historical jobs and the duplicate-URL
//! index. Methods on [`SqliteStore`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`jobs`] — Queue record CRUD
//! - [`history`] — Terminal outcomes and the duplicate index

use crate::error::Result;
use crate::persistence::{HistoryEntry, JobRecord, JobStore, StatusDetail};
use crate::types::{JobId, Status};
use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::sqlite::SqlitePool;

mod history;
mod jobs;
mod migrations;


/// Job record as read back from the database
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Engine-assigned job id
    pub id: i64,
    /// Source URL
    pub url: String,
    /// Destination directory
    pub destination: String,
    /// Format/quality selector, if any
    pub format_hint: Option<String>,
    /// Content-category hint, if any
    pub category: Option<String>,
    /// Priority
    pub priority: i32,
    /// Status code (see [`Status::from_i32`])
    pub status: i32,
    /// Progress percentage
    pub progress: f32,
    /// Error message, if the job failed
    pub error_message: Option<String>,
    /// Submission timestamp (epoch millis)
    pub created_at: i64,
    /// Execution start timestamp (epoch millis)
    pub started_at: Option<i64>,
    /// Terminal timestamp (epoch millis)
    pub completed_at: Option<i64>,
}

/// History record as read back from the database
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Database row id
    pub id: i64,
    /// Job id the record belongs to
    pub job_id: i64,
    /// Source URL
    pub source_url: String,
    /// Item title, when metadata was resolved
    pub title: Option<String>,
    /// Channel / account that owns the item
    pub uploader: Option<String>,
    /// Content-category hint, if any
    pub category: Option<String>,
    /// Terminal status code
    pub status: i32,
    /// Final materialized path
    pub final_path: Option<String>,
    /// Error message, if the job failed
    pub error_message: Option<String>,
    /// Bytes transferred
    pub size_bytes: i64,
    /// Terminal timestamp (epoch seconds)
    pub completed_at: i64,
}

/// SQLite-backed [`JobStore`]
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn is_duplicate(&self, url: &str) -> Result<bool> {
        self.history_contains(url).await
    }

    async fn record_queued(&self, record: &JobRecord) -> Result<()> {
        self.insert_job(record).await
    }

    async fn update_status(&self, id: JobId, status: Status, detail: &StatusDetail) -> Result<()> {
        self.update_job_status(id, status, detail).await
    }

    async fn record_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.insert_history(entry).await
    }
}
