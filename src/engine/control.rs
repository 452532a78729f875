//! Job lifecycle control — pause, resume, cancel, status queries.
//!
//! Control calls return `false` when the job is missing or the transition is
//! illegal for its current state; state is never altered on rejection.

use crate::persistence::StatusDetail;
use crate::types::{Event, JobId, JobSnapshot, Status};
use std::sync::atomic::Ordering;

use super::MediaEngine;

impl MediaEngine {
    /// Pause an executing job
    ///
    /// Legal only while the job is `Downloading` or `Processing`: the
    /// resolver call is signalled to abort and the job moves to the paused
    /// set, keeping its original priority and submission order for later
    /// resume. Returns `false` if the job is not found or not in a pausable
    /// state (including jobs still pending in the queue).
    pub async fn pause(&self, id: JobId) -> bool {
        let mut active = self.state.active.lock().await;
        let Some(entry) = active.remove(&id) else {
            tracing::debug!(job_id = id.0, "pause rejected: job not active");
            return false;
        };

        let status = entry.job.status();
        if !matches!(status, Status::Downloading | Status::Processing) {
            // Not a pausable state (e.g. waiting out a retry backoff);
            // put the entry back untouched
            tracing::debug!(job_id = id.0, status = %status, "pause rejected: invalid state");
            active.insert(id, entry);
            return false;
        }

        entry.cancel.cancel();
        {
            let mut state = entry.job.lock_state();
            state.status = Status::Paused;
            state.speed_bps = 0;
            state.eta_secs = None;
        }
        self.state.paused.lock().await.insert(id, entry.job.clone());
        drop(active);

        tracing::info!(job_id = id.0, "job paused");
        self.persist_status(id, Status::Paused, StatusDetail::default())
            .await;
        self.emit_event(Event::Paused { id });

        true
    }

    /// Resume a paused job
    ///
    /// Re-enqueues the job with its original priority and submission
    /// timestamp, so it re-enters the queue ahead of later submissions at
    /// the same priority. Returns `false` if the job is not paused or the
    /// engine is shutting down.
    pub async fn resume(&self, id: JobId) -> bool {
        if !self.state.accepting_new.load(Ordering::SeqCst) {
            tracing::debug!(job_id = id.0, "resume rejected: shutting down");
            return false;
        }

        let Some(job) = self.state.paused.lock().await.remove(&id) else {
            tracing::debug!(job_id = id.0, "resume rejected: job not paused");
            return false;
        };

        {
            let mut state = job.lock_state();
            state.status = Status::Pending;
            state.speed_bps = 0;
            state.eta_secs = None;
        }

        self.state.queue.push(job).await;

        tracing::info!(job_id = id.0, "job resumed");
        self.persist_status(id, Status::Pending, StatusDetail::default())
            .await;
        self.emit_event(Event::Resumed { id });

        true
    }

    /// Cancel a job in any non-terminal state
    ///
    /// A pending job is removed from the queue without executing; an
    /// executing (or retry-waiting) job has its resolver call or backoff
    /// timer aborted, leaving any partial output in place; a paused job is
    /// discarded from the paused set. Returns `false` if the job is not
    /// found (including jobs already terminal).
    pub async fn cancel(&self, id: JobId) -> bool {
        // Pending in the queue
        if let Some(job) = self.state.queue.remove(id).await {
            self.finish_cancel(&job).await;
            return true;
        }

        // Claimed by a worker or waiting out a retry backoff
        let entry = self.state.active.lock().await.remove(&id);
        if let Some(entry) = entry {
            entry.cancel.cancel();
            self.finish_cancel(&entry.job).await;
            return true;
        }

        // Held in the paused set
        let job = self.state.paused.lock().await.remove(&id);
        if let Some(job) = job {
            self.finish_cancel(&job).await;
            return true;
        }

        tracing::debug!(job_id = id.0, "cancel rejected: job not found");
        false
    }

    /// Freeze a job as cancelled, persist, and notify
    async fn finish_cancel(&self, job: &crate::types::Job) {
        let completed_at = chrono::Utc::now().timestamp_millis();
        {
            let mut state = job.lock_state();
            state.status = Status::Cancelled;
            state.speed_bps = 0;
            state.eta_secs = None;
            state.completed_at = Some(completed_at);
        }

        tracing::info!(job_id = job.id.0, "job cancelled");
        self.persist_status(
            job.id,
            Status::Cancelled,
            StatusDetail {
                completed_at: Some(completed_at),
                ..Default::default()
            },
        )
        .await;
        self.emit_event(Event::Cancelled { id: job.id });
    }

    /// Snapshot of a job in the queue, active set, or paused set
    ///
    /// Terminal jobs are dropped from memory once reported; their durable
    /// record lives in the persistence collaborator.
    pub async fn get_status(&self, id: JobId) -> Option<JobSnapshot> {
        if let Some(entry) = self.state.active.lock().await.get(&id) {
            return Some(entry.job.snapshot());
        }
        if let Some(job) = self.state.paused.lock().await.get(&id) {
            return Some(job.snapshot());
        }
        self.state.queue.find(id).await.map(|job| job.snapshot())
    }

    /// Snapshots of all jobs currently claimed by workers
    pub async fn list_active(&self) -> Vec<JobSnapshot> {
        self.state
            .active
            .lock()
            .await
            .values()
            .map(|entry| entry.job.snapshot())
            .collect()
    }

    /// Snapshots of all jobs waiting in the queue
    pub async fn list_queued(&self) -> Vec<JobSnapshot> {
        self.state.queue.snapshots().await
    }

    /// Number of jobs waiting in the queue
    pub async fn queue_len(&self) -> usize {
        self.state.queue.len().await
    }
}
