//! Shared test helpers for creating MediaEngine instances in tests.

use crate::config::Config;
use crate::engine::MediaEngine;
use crate::error::{Error, Result};
use crate::persistence::{HistoryEntry, JobRecord, JobStore, StatusDetail};
use crate::resolver::{MaterializeRequest, MediaResolver, ProgressFn, TransferUpdate};
use crate::types::{DiscoveredItem, JobId, Metadata, Status};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// Scriptable resolver: counts calls, fails on demand, and can hold a
/// transfer open long enough for pause/cancel to land mid-flight.
pub(crate) struct MockResolver {
    /// Number of resolve_metadata calls made
    pub metadata_calls: AtomicU32,
    /// Number of materialize calls made
    pub materialize_calls: AtomicU32,
    /// Fail this many materialize calls (with a transfer error) before succeeding
    pub fail_materializations: AtomicU32,
    /// Fail every resolve_metadata call
    pub fail_metadata: AtomicBool,
    /// How long materialize holds the transfer open before finishing
    pub transfer_duration: Mutex<Duration>,
    /// Whether materialize reports a post-processing phase before finishing
    pub report_post_processing: AtomicBool,
    /// Collection listings per category; categories absent here error out
    pub listings: Mutex<HashMap<String, Vec<DiscoveredItem>>>,
    /// Categories announced for batch crawls
    pub categories: Mutex<Vec<String>>,
}

impl MockResolver {
    pub(crate) fn new() -> Self {
        Self {
            metadata_calls: AtomicU32::new(0),
            materialize_calls: AtomicU32::new(0),
            fail_materializations: AtomicU32::new(0),
            fail_metadata: AtomicBool::new(false),
            transfer_duration: Mutex::new(Duration::from_millis(5)),
            report_post_processing: AtomicBool::new(true),
            listings: Mutex::new(HashMap::new()),
            categories: Mutex::new(vec!["videos".to_string()]),
        }
    }

    pub(crate) fn set_transfer_duration(&self, duration: Duration) {
        *self.transfer_duration.lock().unwrap() = duration;
    }

    pub(crate) fn set_categories(&self, categories: &[&str]) {
        *self.categories.lock().unwrap() = categories.iter().map(|c| c.to_string()).collect();
    }

    pub(crate) fn set_listing(&self, category: &str, urls: &[&str]) {
        self.listings.lock().unwrap().insert(
            category.to_string(),
            urls.iter()
                .map(|u| DiscoveredItem {
                    url: u.to_string(),
                    title: None,
                })
                .collect(),
        );
    }
}

#[async_trait]
impl MediaResolver for MockResolver {
    async fn resolve_metadata(&self, url: &str) -> Result<Metadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(Error::Resolution(format!("cannot identify {url}")));
        }
        Ok(Metadata {
            id: format!("id-{}", url.len()),
            title: format!("Title for {url}"),
            uploader: Some("test channel".to_string()),
            duration_secs: Some(120),
            upload_date: None,
            webpage_url: Some(url.to_string()),
        })
    }

    async fn materialize(
        &self,
        request: MaterializeRequest<'_>,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.materialize_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_materializations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_materializations
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Transfer("connection reset".to_string()));
        }

        on_progress(TransferUpdate::Progress {
            downloaded_bytes: 512,
            total_bytes: 1024,
            speed_bps: 1024,
            eta_secs: Some(1),
        });

        let duration = *self.transfer_duration.lock().unwrap();
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        }

        on_progress(TransferUpdate::Progress {
            downloaded_bytes: 1024,
            total_bytes: 1024,
            speed_bps: 1024,
            eta_secs: Some(0),
        });

        if self.report_post_processing.load(Ordering::SeqCst) {
            on_progress(TransferUpdate::PostProcessing);
        }

        Ok(request.destination.join("media.mp4"))
    }

    fn batch_categories(&self) -> Vec<String> {
        self.categories.lock().unwrap().clone()
    }

    async fn list_members(
        &self,
        collection_url: &str,
        category: &str,
    ) -> Result<Vec<DiscoveredItem>> {
        match self.listings.lock().unwrap().get(category) {
            Some(members) => Ok(members.clone()),
            None => Err(Error::Resolution(format!(
                "listing {category} of {collection_url} failed"
            ))),
        }
    }
}

/// In-memory store capturing every call for assertions; can simulate a full
/// persistence outage.
pub(crate) struct MemoryStore {
    /// URLs reported as already downloaded
    pub downloaded: Mutex<HashSet<String>>,
    /// Records written by record_queued
    pub queued: Mutex<Vec<JobRecord>>,
    /// Status updates in call order
    pub status_updates: Mutex<Vec<(JobId, Status)>>,
    /// History entries in call order
    pub history: Mutex<Vec<HistoryEntry>>,
    /// When set, every call fails
    pub fail_all: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            downloaded: Mutex::new(HashSet::new()),
            queued: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            fail_all: AtomicBool::new(false),
        }
    }

    pub(crate) fn mark_downloaded(&self, url: &str) {
        self.downloaded.lock().unwrap().insert(url.to_string());
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(Error::Persistence("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn is_duplicate(&self, url: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.downloaded.lock().unwrap().contains(url))
    }

    async fn record_queued(&self, record: &JobRecord) -> Result<()> {
        self.check_available()?;
        self.queued.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn update_status(&self, id: JobId, status: Status, _detail: &StatusDetail) -> Result<()> {
        self.check_available()?;
        self.status_updates.lock().unwrap().push((id, status));
        Ok(())
    }

    async fn record_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.check_available()?;
        if entry.status == Status::Completed {
            self.downloaded.lock().unwrap().insert(entry.url.clone());
        }
        self.history.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Helper to create a test MediaEngine wired to a mock resolver and an
/// in-memory store. Returns the tempdir too (which must be kept alive).
pub(crate) async fn create_test_engine() -> (
    MediaEngine,
    Arc<MockResolver>,
    Arc<MemoryStore>,
    tempfile::TempDir,
) {
    create_test_engine_with(Config::default()).await
}

/// Like [`create_test_engine`] but with a caller-adjusted config; the
/// download directory and retry delays are always set to test-friendly values.
pub(crate) async fn create_test_engine_with(
    mut config: Config,
) -> (
    MediaEngine,
    Arc<MockResolver>,
    Arc<MemoryStore>,
    tempfile::TempDir,
) {
    let temp_dir = tempdir().unwrap();
    config.download.download_dir = temp_dir.path().join("downloads");
    if config.retry.base_delay == std::time::Duration::from_secs(1) {
        // Keep default-configured tests fast
        config.retry.base_delay = Duration::from_millis(10);
        config.retry.max_delay = Duration::from_secs(1);
    }

    let resolver = Arc::new(MockResolver::new());
    let store = Arc::new(MemoryStore::new());

    let engine = MediaEngine::new(config, resolver.clone(), store.clone())
        .await
        .unwrap();

    (engine, resolver, store, temp_dir)
}

/// Receive events until one matches the predicate, panicking after `timeout`
pub(crate) async fn wait_for_event<F>(
    rx: &mut tokio::sync::broadcast::Receiver<crate::types::Event>,
    timeout: Duration,
    mut predicate: F,
) -> crate::types::Event
where
    F: FnMut(&crate::types::Event) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .expect("timed out waiting for event");
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) if predicate(&event) => return event,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => panic!("event channel closed: {e}"),
            Err(_) => panic!("timed out waiting for event"),
        }
    }
}
