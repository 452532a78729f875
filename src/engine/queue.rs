//! Priority task queue with a blocking, shutdown-aware pop.
//!
//! Ordering contract: higher priority dequeues first; within equal priority,
//! earlier submission dequeues first (FIFO, keyed on the job's submission
//! sequence so a resumed job keeps its original place among peers).

use crate::types::{Job, JobId, JobSnapshot};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Heap entry wrapping a shared job
#[derive(Clone)]
pub(crate) struct QueuedJob {
    pub(crate) job: Arc<Job>,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job.priority == other.job.priority && self.job.seq == other.job.seq
    }
}

impl Eq for QueuedJob {}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // First compare by priority (higher priority wins)
        match self.job.priority.cmp(&other.job.priority) {
            std::cmp::Ordering::Equal => {
                // If priorities are equal, earlier submissions come first (FIFO)
                // Note: Reversed because the heap is a max-heap and the lower
                // sequence number must surface first
                other.job.seq.cmp(&self.job.seq)
            }
            ordering => ordering,
        }
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Thread-safe priority queue of pending jobs
///
/// `pop` blocks until a job is available or shutdown is signalled; a popped
/// job is atomically removed and never returned twice unless explicitly
/// re-pushed (e.g. on retry or resume).
pub(crate) struct TaskQueue {
    heap: Mutex<BinaryHeap<QueuedJob>>,
    notify: Notify,
    shutdown: CancellationToken,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Insert a job by priority and wake one blocked popper
    pub(crate) async fn push(&self, job: Arc<Job>) {
        self.heap.lock().await.push(QueuedJob { job });
        self.notify.notify_one();
    }

    /// Remove and return the highest-priority job, blocking while the queue
    /// is empty. Returns `None` once shutdown has been signalled.
    pub(crate) async fn pop(&self) -> Option<Arc<Job>> {
        loop {
            if self.shutdown.is_cancelled() {
                return None;
            }

            // Register interest before checking the heap so a push landing
            // in between cannot be missed
            let notified = self.notify.notified();

            if let Some(entry) = self.heap.lock().await.pop() {
                return Some(entry.job);
            }

            tokio::select! {
                _ = notified => {}
                _ = self.shutdown.cancelled() => return None,
            }
        }
    }

    /// Remove a specific job from the queue without executing it
    ///
    /// Returns the job if it was found and removed.
    pub(crate) async fn remove(&self, id: JobId) -> Option<Arc<Job>> {
        let mut heap = self.heap.lock().await;

        let mut removed = None;
        let entries: Vec<_> = heap
            .drain()
            .filter(|entry| {
                if entry.job.id == id {
                    removed = Some(entry.job.clone());
                    false
                } else {
                    true
                }
            })
            .collect();

        // Rebuild heap without the removed entry
        *heap = entries.into_iter().collect();

        removed
    }

    /// Find a queued job by id without removing it
    pub(crate) async fn find(&self, id: JobId) -> Option<Arc<Job>> {
        self.heap
            .lock()
            .await
            .iter()
            .find(|entry| entry.job.id == id)
            .map(|entry| entry.job.clone())
    }

    /// Number of pending jobs
    pub(crate) async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    /// Snapshots of all queued jobs (unordered)
    pub(crate) async fn snapshots(&self) -> Vec<JobSnapshot> {
        self.heap
            .lock()
            .await
            .iter()
            .map(|entry| entry.job.snapshot())
            .collect()
    }

    /// Signal shutdown: every blocked and future `pop` returns `None`
    pub(crate) fn shut_down(&self) {
        self.shutdown.cancel();
        self.notify.notify_waiters();
    }

    /// Whether shutdown has been signalled
    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
