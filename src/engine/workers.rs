//! Worker pool and job execution driver.
//!
//! A fixed number of workers loop on the task queue; each drives one job at
//! a time through resolution, materialization, and completion or retry.
//! Only per-job state is mutated while a resolver call is in flight; the
//! engine-wide set locks are held only for the brief ownership handoffs.

use crate::config::WebhookEvent;
use crate::error::Error;
use crate::persistence::{HistoryEntry, StatusDetail};
use crate::resolver::{MaterializeRequest, TransferUpdate};
use crate::retry::{IsRetryable, add_jitter, backoff_delay};
use crate::types::{Event, Job, Status};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ActiveJob, MediaEngine, TriggerWebhooksParams};

impl MediaEngine {
    /// Start the worker pool
    ///
    /// Spawns `max_concurrent_downloads` workers, each pulling jobs from the
    /// priority queue until shutdown. Calling `start` more than once adds
    /// more workers, so it is expected to be called exactly once.
    pub async fn start(&self) {
        let worker_count = self.config.download.max_concurrent_downloads.max(1);
        let mut handles = self.state.workers.lock().await;

        for worker_idx in 0..worker_count {
            let engine = self.clone();
            handles.push(tokio::spawn(async move {
                engine.worker_loop(worker_idx).await;
            }));
        }

        tracing::info!(worker_count, "worker pool started");
    }

    /// One worker: block on the queue, claim the job, drive it to a terminal
    /// state or retry hand-off, repeat until shutdown
    async fn worker_loop(&self, worker_idx: usize) {
        tracing::debug!(worker = worker_idx, "worker started");

        while let Some(job) = self.state.queue.pop().await {
            let cancel = CancellationToken::new();
            {
                let mut active = self.state.active.lock().await;
                active.insert(
                    job.id,
                    ActiveJob {
                        job: job.clone(),
                        cancel: cancel.clone(),
                    },
                );
            }

            tracing::info!(worker = worker_idx, job_id = job.id.0, url = %job.url, "job claimed");
            self.run_job(job, cancel).await;
        }

        tracing::debug!(worker = worker_idx, "worker stopped");
    }

    /// Drive one claimed job: resolve metadata, materialize, complete or fail
    async fn run_job(&self, job: Arc<Job>, cancel: CancellationToken) {
        let started_at = chrono::Utc::now().timestamp_millis();
        {
            let mut state = job.lock_state();
            state.status = Status::Downloading;
            state.started_at = Some(started_at);
        }
        self.persist_status(
            job.id,
            Status::Downloading,
            StatusDetail {
                started_at: Some(started_at),
                ..Default::default()
            },
        )
        .await;

        // Metadata first (cache-aware); a cancelled job skips straight out
        let metadata = match self.resolve_metadata(&job.url, true).await {
            Ok(metadata) => metadata,
            Err(e) => {
                if self.job_was_taken_over(&job) {
                    return;
                }
                self.handle_job_failure(job, e).await;
                return;
            }
        };

        tracing::debug!(job_id = job.id.0, title = %metadata.title, "metadata resolved");
        {
            job.lock_state().metadata = Some(metadata);
        }

        // Relay every resolver update into the job's state and the event stream
        let progress_job = job.clone();
        let event_tx = self.event_tx.clone();
        let persist_engine = self.clone();
        let on_progress = move |update: TransferUpdate| match update {
            TransferUpdate::Progress {
                downloaded_bytes,
                total_bytes,
                speed_bps,
                eta_secs,
            } => {
                let percent = {
                    let mut state = progress_job.lock_state();
                    // Late callbacks after a pause/cancel must not revive the job
                    if state.status != Status::Downloading {
                        return;
                    }
                    if total_bytes > 0 {
                        state.progress = (downloaded_bytes as f32 / total_bytes as f32) * 100.0;
                    }
                    state.downloaded_bytes = downloaded_bytes;
                    state.total_bytes = total_bytes;
                    state.speed_bps = speed_bps;
                    state.eta_secs = eta_secs;
                    state.progress
                };
                event_tx
                    .send(Event::Progress {
                        id: progress_job.id,
                        percent,
                        speed_bps,
                        eta_secs,
                        downloaded_bytes,
                        total_bytes,
                    })
                    .ok();
            }
            TransferUpdate::PostProcessing => {
                {
                    let mut state = progress_job.lock_state();
                    if state.status != Status::Downloading {
                        return;
                    }
                    state.status = Status::Processing;
                    state.progress = 100.0;
                    state.speed_bps = 0;
                    state.eta_secs = None;
                }
                event_tx
                    .send(Event::Processing {
                        id: progress_job.id,
                    })
                    .ok();

                let engine = persist_engine.clone();
                let id = progress_job.id;
                tokio::spawn(async move {
                    engine
                        .persist_status(
                            id,
                            Status::Processing,
                            StatusDetail {
                                progress: Some(100.0),
                                ..Default::default()
                            },
                        )
                        .await;
                });
            }
        };

        let result = self
            .resolver
            .materialize(
                MaterializeRequest {
                    url: &job.url,
                    destination: &job.destination,
                    format_hint: job.format_hint.as_deref(),
                },
                &on_progress,
                &cancel,
            )
            .await;

        match result {
            Ok(final_path) => self.handle_job_success(job, final_path).await,
            Err(e) => {
                // A pause or cancel moved the job out from under us; partial
                // output stays in place and the worker simply moves on
                if self.job_was_taken_over(&job) {
                    return;
                }
                self.handle_job_failure(job, e).await;
            }
        }
    }

    /// Whether an explicit pause/cancel already took ownership of the job
    fn job_was_taken_over(&self, job: &Job) -> bool {
        matches!(job.status(), Status::Paused | Status::Cancelled)
    }

    /// Completion path: freeze state, persist, record history, notify
    async fn handle_job_success(&self, job: Arc<Job>, final_path: std::path::PathBuf) {
        // Release the active-set entry; if a concurrent cancel got there
        // first the job is no longer ours to complete
        if self.state.active.lock().await.remove(&job.id).is_none() {
            tracing::debug!(job_id = job.id.0, "job cancelled at completion; dropping result");
            return;
        }

        let completed_at = chrono::Utc::now().timestamp_millis();
        let (title, uploader, size_bytes) = {
            let mut state = job.lock_state();
            state.status = Status::Completed;
            state.progress = 100.0;
            state.speed_bps = 0;
            state.eta_secs = None;
            state.completed_at = Some(completed_at);
            (
                state.metadata.as_ref().map(|m| m.title.clone()),
                state.metadata.as_ref().and_then(|m| m.uploader.clone()),
                state.downloaded_bytes,
            )
        };

        tracing::info!(job_id = job.id.0, path = %final_path.display(), "job completed");

        self.persist_status(
            job.id,
            Status::Completed,
            StatusDetail {
                progress: Some(100.0),
                completed_at: Some(completed_at),
                ..Default::default()
            },
        )
        .await;

        self.persist_history(&HistoryEntry {
            id: job.id,
            url: job.url.clone(),
            title: title.clone(),
            uploader,
            category: job.category.clone(),
            status: Status::Completed,
            final_path: Some(final_path.clone()),
            error: None,
            size_bytes,
            completed_at: completed_at / 1000,
        })
        .await;

        self.emit_event(Event::Completed {
            id: job.id,
            path: final_path.clone(),
        });

        self.trigger_webhooks(TriggerWebhooksParams {
            event_type: WebhookEvent::OnComplete,
            job_id: job.id,
            url: job.url.clone(),
            title,
            status: Status::Completed.to_string(),
            destination: Some(final_path),
            error: None,
        });

        self.note_completion();
    }

    /// Failure path: count the attempt, then either schedule a re-queue
    /// after backoff or freeze the job as terminally failed
    async fn handle_job_failure(&self, job: Arc<Job>, error: Error) {
        let error_msg = error.to_string();
        let attempts = {
            let mut state = job.lock_state();
            state.attempts += 1;
            state.error_message = Some(error_msg.clone());
            state.attempts
        };

        if error.is_retryable() && attempts < self.config.retry.max_attempts {
            tracing::warn!(
                job_id = job.id.0,
                error = %error_msg,
                attempt = attempts,
                max_attempts = self.config.retry.max_attempts,
                "job failed; scheduling retry"
            );
            self.schedule_retry(job, attempts).await;
            return;
        }

        // Terminal failure: either retries are exhausted or the error is permanent
        self.state.active.lock().await.remove(&job.id);

        let completed_at = chrono::Utc::now().timestamp_millis();
        let (title, size_bytes) = {
            let mut state = job.lock_state();
            state.status = Status::Failed;
            state.speed_bps = 0;
            state.eta_secs = None;
            state.completed_at = Some(completed_at);
            (
                state.metadata.as_ref().map(|m| m.title.clone()),
                state.downloaded_bytes,
            )
        };

        tracing::error!(
            job_id = job.id.0,
            error = %error_msg,
            attempts,
            "job terminally failed"
        );

        self.persist_status(
            job.id,
            Status::Failed,
            StatusDetail {
                error: Some(error_msg.clone()),
                completed_at: Some(completed_at),
                ..Default::default()
            },
        )
        .await;

        self.persist_history(&HistoryEntry {
            id: job.id,
            url: job.url.clone(),
            title: title.clone(),
            uploader: None,
            category: job.category.clone(),
            status: Status::Failed,
            final_path: None,
            error: Some(error_msg.clone()),
            size_bytes,
            completed_at: completed_at / 1000,
        })
        .await;

        self.emit_event(Event::Failed {
            id: job.id,
            error: error_msg.clone(),
            attempts,
        });

        self.trigger_webhooks(TriggerWebhooksParams {
            event_type: WebhookEvent::OnFailed,
            job_id: job.id,
            url: job.url.clone(),
            title,
            status: Status::Failed.to_string(),
            destination: None,
            error: Some(error_msg),
        });
    }

    /// Wait out the backoff off-worker, then re-push with original priority
    ///
    /// The job stays in the active set while it waits (with a fresh token so
    /// an explicit cancel aborts the timer); the worker slot itself is freed
    /// immediately. Re-pushing reuses the job as-is, so the original
    /// priority and submission order are preserved.
    async fn schedule_retry(&self, job: Arc<Job>, attempts: u32) {
        let delay = {
            let base = backoff_delay(&self.config.retry, attempts);
            if self.config.retry.jitter {
                add_jitter(base)
            } else {
                base
            }
        };

        let timer_token = {
            let mut active = self.state.active.lock().await;
            match active.get_mut(&job.id) {
                Some(entry) => {
                    // Swap in a token that aborts the backoff timer; the job
                    // goes back to Pending while it waits
                    let token = CancellationToken::new();
                    entry.cancel = token.clone();
                    job.lock_state().status = Status::Pending;
                    token
                }
                // A concurrent cancel already took the job
                None => return,
            }
        };

        self.persist_status(job.id, Status::Pending, StatusDetail::default())
            .await;

        self.emit_event(Event::Retrying {
            id: job.id,
            attempt: attempts,
            delay_ms: delay.as_millis() as u64,
        });

        let engine = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    // Hand ownership from the active set back to the queue;
                    // if the entry is gone the job was cancelled while waiting
                    if engine.state.active.lock().await.remove(&job.id).is_none() {
                        return;
                    }
                    tracing::info!(job_id = job.id.0, attempt = attempts, "re-queueing after backoff");
                    engine.state.queue.push(job).await;
                }
                _ = timer_token.cancelled() => {
                    tracing::debug!(job_id = job.id.0, "retry wait aborted");
                }
            }
        });
    }
}
