//! Persistence collaborator contract
//!
//! The engine keeps authoritative job state in memory and mirrors it into a
//! [`JobStore`] for durability and the duplicate-URL index. Store failures
//! are tolerated: every engine call site logs them at warn level and keeps
//! going, so an unavailable store never fails an otherwise-successful job.

use crate::error::Result;
use crate::types::{JobId, Status};
use async_trait::async_trait;
use std::path::PathBuf;

/// Durable record written when a job is accepted into the queue
#[derive(Clone, Debug)]
pub struct JobRecord {
    /// Engine-assigned job id
    pub id: JobId,
    /// Source URL
    pub url: String,
    /// Destination directory
    pub destination: String,
    /// Optional format/quality selector
    pub format_hint: Option<String>,
    /// Optional content-category hint
    pub category: Option<String>,
    /// Priority
    pub priority: i32,
    /// Submission timestamp (epoch millis)
    pub created_at: i64,
}

/// Optional fields accompanying a status update
#[derive(Clone, Debug, Default)]
pub struct StatusDetail {
    /// Progress percentage at update time
    pub progress: Option<f32>,
    /// Error message (failed jobs)
    pub error: Option<String>,
    /// Execution start timestamp (epoch millis)
    pub started_at: Option<i64>,
    /// Terminal timestamp (epoch millis)
    pub completed_at: Option<i64>,
}

/// Historical record of a job that reached a terminal state
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Job id
    pub id: JobId,
    /// Source URL (feeds the duplicate index)
    pub url: String,
    /// Item title, when metadata was resolved
    pub title: Option<String>,
    /// Channel / account that owns the item
    pub uploader: Option<String>,
    /// Content-category hint, if any
    pub category: Option<String>,
    /// Terminal status
    pub status: Status,
    /// Final materialized path (completed jobs)
    pub final_path: Option<PathBuf>,
    /// Error message (failed jobs)
    pub error: Option<String>,
    /// Bytes transferred
    pub size_bytes: u64,
    /// Terminal timestamp (epoch seconds)
    pub completed_at: i64,
}

/// Durable record of queued/historical jobs and the duplicate-URL index
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Whether this URL was already downloaded (consults the history index)
    async fn is_duplicate(&self, url: &str) -> Result<bool>;

    /// Record a newly accepted job
    async fn record_queued(&self, record: &JobRecord) -> Result<()>;

    /// Mirror a lifecycle status change
    async fn update_status(&self, id: JobId, status: Status, detail: &StatusDetail) -> Result<()>;

    /// Record the terminal outcome of a job
    async fn record_history(&self, entry: &HistoryEntry) -> Result<()>;
}
