//! Core types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Unique identifier for a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for JobId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for JobId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for JobId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Job lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// In the task queue, not yet claimed by a worker
    Pending,
    /// Claimed by a worker, metadata resolution or transfer in progress
    Downloading,
    /// Transfer bytes complete, post-processing (e.g. stream merge) underway
    Processing,
    /// Terminal: finished successfully
    Completed,
    /// Terminal: failed after retries were exhausted
    Failed,
    /// Held out of execution by an explicit pause
    Paused,
    /// Terminal: explicitly cancelled
    Cancelled,
}

impl Status {
    /// Convert integer status code to Status enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => Status::Pending,
            1 => Status::Downloading,
            2 => Status::Processing,
            3 => Status::Completed,
            4 => Status::Failed,
            5 => Status::Paused,
            6 => Status::Cancelled,
            _ => Status::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert Status enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            Status::Pending => 0,
            Status::Downloading => 1,
            Status::Processing => 2,
            Status::Completed => 3,
            Status::Failed => 4,
            Status::Paused => 5,
            Status::Cancelled => 6,
        }
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Cancelled)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Downloading => "downloading",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Paused => "paused",
            Status::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Resolved metadata for a media item
///
/// Populated by the resolver once metadata resolution succeeds and frozen on
/// the job from then on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Canonical item identifier assigned by the content platform
    pub id: String,
    /// Item title
    pub title: String,
    /// Channel / account that owns the item
    pub uploader: Option<String>,
    /// Duration in seconds, if known
    pub duration_secs: Option<u64>,
    /// Upload date as reported by the platform (YYYYMMDD)
    pub upload_date: Option<String>,
    /// Canonical web page URL for the item
    pub webpage_url: Option<String>,
}

/// One user-requested download unit, tracked through its lifecycle.
///
/// Identity and scheduling attributes are immutable; runtime state lives
/// behind a per-job mutex so workers never need an engine-wide lock to
/// update progress.
#[derive(Debug)]
pub struct Job {
    /// Unique id, assigned at submission
    pub id: JobId,
    /// Source URL to resolve
    pub url: String,
    /// Destination directory for the materialized file
    pub destination: PathBuf,
    /// Optional explicit format/quality selector passed through to the resolver
    pub format_hint: Option<String>,
    /// Optional content-category hint (sub-directory naming in batch crawls)
    pub category: Option<String>,
    /// Priority; higher values are serviced first
    pub priority: i32,
    /// Submission wall-clock timestamp (epoch millis)
    pub created_at: i64,
    /// Monotonic submission sequence, FIFO tie-break within equal priority
    pub(crate) seq: u64,
    /// Mutable runtime state, guarded per-job
    pub(crate) state: Mutex<JobState>,
}

/// Mutable runtime state of a [`Job`]
#[derive(Clone, Debug)]
pub(crate) struct JobState {
    pub(crate) status: Status,
    pub(crate) progress: f32,
    pub(crate) speed_bps: u64,
    pub(crate) eta_secs: Option<u64>,
    pub(crate) downloaded_bytes: u64,
    pub(crate) total_bytes: u64,
    pub(crate) error_message: Option<String>,
    pub(crate) attempts: u32,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) started_at: Option<i64>,
    pub(crate) completed_at: Option<i64>,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            status: Status::Pending,
            progress: 0.0,
            speed_bps: 0,
            eta_secs: None,
            downloaded_bytes: 0,
            total_bytes: 0,
            error_message: None,
            attempts: 0,
            metadata: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Point-in-time copy of a [`Job`]'s identity and runtime state.
///
/// Returned by the engine's status and listing APIs; serializable so it can
/// cross process boundaries (webhooks, history records).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job id
    pub id: JobId,
    /// Source URL
    pub url: String,
    /// Destination directory
    pub destination: PathBuf,
    /// Optional explicit format/quality selector
    pub format_hint: Option<String>,
    /// Optional content-category hint
    pub category: Option<String>,
    /// Scheduling priority
    pub priority: i32,
    /// Submission wall-clock timestamp (epoch millis)
    pub created_at: i64,
    /// Current lifecycle status
    pub status: Status,
    /// Transfer progress percentage (0.0 to 100.0)
    pub progress: f32,
    /// Current transfer speed in bytes per second
    pub speed_bps: u64,
    /// Estimated seconds remaining, if known
    pub eta_secs: Option<u64>,
    /// Bytes transferred so far
    pub downloaded_bytes: u64,
    /// Total bytes expected, if known
    pub total_bytes: u64,
    /// Last error message, if the job has failed
    pub error_message: Option<String>,
    /// Number of attempts made so far
    pub attempts: u32,
    /// Resolved metadata, once available
    pub metadata: Option<Metadata>,
    /// Wall-clock timestamp when execution began (epoch millis)
    pub started_at: Option<i64>,
    /// Wall-clock timestamp when the job reached a terminal state (epoch millis)
    pub completed_at: Option<i64>,
}

/// Counter backing job id assignment
static NEXT_JOB_ID: AtomicI64 = AtomicI64::new(1);
/// Counter backing the FIFO tie-break sequence
static NEXT_JOB_SEQ: AtomicU64 = AtomicU64::new(1);

impl Job {
    /// Create a new pending job with a fresh id and submission sequence
    pub(crate) fn new(
        url: String,
        destination: PathBuf,
        format_hint: Option<String>,
        category: Option<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: JobId(NEXT_JOB_ID.fetch_add(1, Ordering::SeqCst)),
            url,
            destination,
            format_hint,
            category,
            priority,
            created_at: chrono::Utc::now().timestamp_millis(),
            seq: NEXT_JOB_SEQ.fetch_add(1, Ordering::SeqCst),
            state: Mutex::new(JobState::default()),
        }
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.lock_state().status
    }

    /// Point-in-time snapshot of identity and runtime state
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.lock_state().clone();
        JobSnapshot {
            id: self.id,
            url: self.url.clone(),
            destination: self.destination.clone(),
            format_hint: self.format_hint.clone(),
            category: self.category.clone(),
            priority: self.priority,
            created_at: self.created_at,
            status: state.status,
            progress: state.progress,
            speed_bps: state.speed_bps,
            eta_secs: state.eta_secs,
            downloaded_bytes: state.downloaded_bytes,
            total_bytes: state.total_bytes,
            error_message: state.error_message,
            attempts: state.attempts,
            metadata: state.metadata,
            started_at: state.started_at,
            completed_at: state.completed_at,
        }
    }

    /// Lock the per-job state, recovering from a poisoned lock.
    ///
    /// State updates are plain field writes; a panic mid-update cannot leave
    /// the state inconsistent, so the poison flag carries no information here.
    pub(crate) fn lock_state(&self) -> std::sync::MutexGuard<'_, JobState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A member item discovered while crawling a collection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveredItem {
    /// Item URL as reported by the resolver
    pub url: String,
    /// Item title, when the listing carries one
    pub title: Option<String>,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and added to the task queue
    Queued {
        /// Job id
        id: JobId,
        /// Source URL
        url: String,
        /// Priority the job was queued with
        priority: i32,
    },

    /// Transfer progress update
    Progress {
        /// Job id
        id: JobId,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Current transfer rate in bytes per second
        speed_bps: u64,
        /// Estimated seconds remaining, if known
        eta_secs: Option<u64>,
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes expected, 0 if unknown
        total_bytes: u64,
    },

    /// Transfer finished, post-processing underway (no more network I/O)
    Processing {
        /// Job id
        id: JobId,
    },

    /// Job fully complete
    Completed {
        /// Job id
        id: JobId,
        /// Final materialized path
        path: PathBuf,
    },

    /// Job terminally failed (retries exhausted or error not retryable)
    Failed {
        /// Job id
        id: JobId,
        /// Error message
        error: String,
        /// Failure attempts consumed
        attempts: u32,
    },

    /// Job paused by an explicit pause call
    Paused {
        /// Job id
        id: JobId,
    },

    /// Paused job re-enqueued by an explicit resume call
    Resumed {
        /// Job id
        id: JobId,
    },

    /// Job cancelled
    Cancelled {
        /// Job id
        id: JobId,
    },

    /// Transient failure; the job will be re-queued after a backoff delay
    Retrying {
        /// Job id
        id: JobId,
        /// Failure attempts so far
        attempt: u32,
        /// Backoff delay before the job re-enters the queue
        delay_ms: u64,
    },

    /// Batch crawl summary, emitted once per crawl
    BatchSummary {
        /// The collection URL that was crawled
        collection_url: String,
        /// Members discovered across all sub-categories
        total_found: usize,
        /// Jobs newly submitted
        added: usize,
        /// Members skipped as already downloaded
        skipped_duplicate: usize,
        /// Sub-categories whose listing failed
        failed_categories: Vec<String>,
    },

    /// Webhook delivery failed
    WebhookFailed {
        /// Webhook URL
        url: String,
        /// Error message
        error: String,
    },

    /// Engine shutdown complete
    Shutdown,
}

/// Payload POSTed to configured webhooks
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event name ("queued", "completed", "failed")
    pub event: String,
    /// Job id
    pub job_id: JobId,
    /// Source URL
    pub url: String,
    /// Item title, when metadata was resolved
    pub title: Option<String>,
    /// Status string at the time of the event
    pub status: String,
    /// Final path (completed jobs)
    pub destination: Option<PathBuf>,
    /// Error message (failed jobs)
    pub error: Option<String>,
    /// Unix timestamp when the event fired
    pub timestamp: i64,
}
