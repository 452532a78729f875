//! Core engine implementation split into focused submodules.
//!
//! The `MediaEngine` struct and its methods are organized by domain:
//! - [`queue`] - Priority task queue with blocking pop
//! - [`submit`] - Single-job submission
//! - [`crawl`] - Batch crawling of collection URLs
//! - [`workers`] - Worker pool and job execution driver
//! - [`control`] - Job lifecycle control (pause/resume/cancel, status queries)
//! - [`lifecycle`] - Graceful shutdown coordination
//! - [`webhooks`] - Webhook notifications

pub(crate) mod queue;

mod control;
mod crawl;
mod lifecycle;
mod submit;
mod webhooks;
mod workers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use crawl::BatchRequest;
pub use submit::SubmitRequest;
pub use webhooks::TriggerWebhooksParams;

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::error::Result;
use crate::persistence::{HistoryEntry, JobRecord, JobStore, StatusDetail};
use crate::resolver::MediaResolver;
use crate::store::SqliteStore;
use crate::types::{Event, Job, JobId, Metadata, Status};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// A job currently owned by the worker pool (executing, or waiting out a
/// retry backoff); the token cancels the resolver call or the backoff timer
pub(crate) struct ActiveJob {
    pub(crate) job: Arc<Job>,
    pub(crate) cancel: CancellationToken,
}

/// Queue and job ownership state
///
/// A non-terminal job is owned by exactly one of {queue, active, paused};
/// all moves between sets happen under the relevant set lock.
pub(crate) struct EngineState {
    /// Priority task queue of pending jobs
    pub(crate) queue: queue::TaskQueue,
    /// Jobs claimed by workers, keyed by id
    pub(crate) active: tokio::sync::Mutex<HashMap<JobId, ActiveJob>>,
    /// Jobs held out of execution by an explicit pause
    pub(crate) paused: tokio::sync::Mutex<HashMap<JobId, Arc<Job>>>,
    /// Whether new jobs are accepted (cleared when shutdown begins)
    pub(crate) accepting_new: AtomicBool,
    /// Completions since the last opportunistic cache sweep
    pub(crate) completions_since_purge: AtomicU64,
    /// Worker task handles, joined during shutdown
    pub(crate) workers: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl EngineState {
    pub(crate) fn new() -> Self {
        Self {
            queue: queue::TaskQueue::new(),
            active: tokio::sync::Mutex::new(HashMap::new()),
            paused: tokio::sync::Mutex::new(HashMap::new()),
            accepting_new: AtomicBool::new(true),
            completions_since_purge: AtomicU64::new(0),
            workers: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

/// Main engine instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the task queue, worker pool, retry scheduling, metadata cache, and
/// event stream. The content platform is reached exclusively through the
/// injected [`MediaResolver`]; durability goes through the injected
/// [`JobStore`].
#[derive(Clone)]
pub struct MediaEngine {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Resolution service collaborator
    pub(crate) resolver: Arc<dyn MediaResolver>,
    /// Persistence collaborator
    pub(crate) store: Arc<dyn JobStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Short-TTL metadata cache
    pub(crate) cache: Arc<MetadataCache>,
    /// Queue and job ownership state
    pub(crate) state: Arc<EngineState>,
}

impl MediaEngine {
    /// Create a new engine with explicit resolver and store collaborators
    ///
    /// The worker pool is not running until [`start`](Self::start) is called.
    pub async fn new(
        config: Config,
        resolver: Arc<dyn MediaResolver>,
        store: Arc<dyn JobStore>,
    ) -> Result<Self> {
        // Ensure the download directory exists up front
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                crate::error::Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        // Broadcast channel: subscribers that lag past the buffer drop events
        // rather than stalling workers
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1024);

        let cache = Arc::new(MetadataCache::new(config.cache.metadata_ttl));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            store,
            event_tx,
            cache,
            state: Arc::new(EngineState::new()),
        })
    }

    /// Create a new engine backed by the bundled SQLite store
    ///
    /// Opens (or creates) the database at `config.persistence.database_path`
    /// and runs migrations.
    pub async fn with_sqlite(config: Config, resolver: Arc<dyn MediaResolver>) -> Result<Self> {
        let store = SqliteStore::new(&config.persistence.database_path).await?;
        Self::new(config, resolver, Arc::new(store)).await
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered; a subscriber that falls
    /// behind by more than the channel capacity receives
    /// `RecvError::Lagged` and misses the dropped events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Resolve metadata for a URL, consulting the cache first
    ///
    /// With `use_cache`, a non-expired cache entry short-circuits the
    /// resolver; otherwise the resolver is called and the result cached.
    pub async fn resolve_metadata(&self, url: &str, use_cache: bool) -> Result<Metadata> {
        if use_cache
            && let Some(hit) = self.cache.get(url)
        {
            tracing::debug!(url, "metadata cache hit");
            return Ok(hit);
        }

        let metadata = self.resolver.resolve_metadata(url).await?;
        self.cache.insert(url, metadata.clone());
        Ok(metadata)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// job processing continues whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine
        self.event_tx.send(event).ok();
    }

    /// Mirror a status change into the store, tolerating store failure
    pub(crate) async fn persist_status(&self, id: JobId, status: Status, detail: StatusDetail) {
        if let Err(e) = self.store.update_status(id, status, &detail).await {
            tracing::warn!(
                job_id = id.0,
                status = %status,
                error = %e,
                "persistence unavailable; continuing from in-memory state"
            );
        }
    }

    /// Record a queued job in the store, tolerating store failure
    pub(crate) async fn persist_queued(&self, record: &JobRecord) {
        if let Err(e) = self.store.record_queued(record).await {
            tracing::warn!(
                job_id = record.id.0,
                error = %e,
                "persistence unavailable; queued record not written"
            );
        }
    }

    /// Record a terminal outcome in the store, tolerating store failure
    pub(crate) async fn persist_history(&self, entry: &HistoryEntry) {
        if let Err(e) = self.store.record_history(entry).await {
            tracing::warn!(
                job_id = entry.id.0,
                error = %e,
                "persistence unavailable; history record not written"
            );
        }
    }

    /// Bump the completion counter and sweep the metadata cache every
    /// `purge_every_completed` completions
    pub(crate) fn note_completion(&self) {
        let completions = self
            .state
            .completions_since_purge
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        let every = self.config.cache.purge_every_completed;
        if every > 0 && completions % every == 0 {
            self.cache.purge_expired();
            tracing::debug!(completions, "swept expired metadata cache entries");
        }
    }
}
