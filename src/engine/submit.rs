//! Single-job submission.

use crate::config::WebhookEvent;
use crate::error::{Error, Result};
use crate::persistence::JobRecord;
use crate::types::{Event, Job, JobSnapshot, Status};
use crate::utils::sanitize_path_component;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::{MediaEngine, TriggerWebhooksParams};

/// Parameters for submitting a single job
#[derive(Clone, Debug, Default)]
pub struct SubmitRequest {
    /// Source URL to resolve and download
    pub url: String,
    /// Destination directory (defaults to the configured download directory)
    pub destination: Option<PathBuf>,
    /// Priority; higher values are serviced first (defaults to
    /// `download.default_priority`)
    pub priority: Option<i32>,
    /// Optional explicit format/quality selector
    pub format_hint: Option<String>,
    /// Optional content-category hint; becomes a sub-directory of the
    /// destination (used by batch crawls)
    pub category: Option<String>,
}

impl SubmitRequest {
    /// Submission of a URL with engine defaults for everything else
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl MediaEngine {
    /// Submit a URL as a new job
    ///
    /// Rejects synchronously with [`Error::Duplicate`] if the persistence
    /// collaborator reports the URL as already downloaded, and with
    /// [`Error::ShuttingDown`] once shutdown has begun. On success the job
    /// is pending in the task queue and a `Queued` event has been emitted.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobSnapshot> {
        if !self.state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        // Duplicate check; a failing store is treated as "not a duplicate"
        // so downloads keep working while the store is down
        match self.store.is_duplicate(&request.url).await {
            Ok(true) => {
                tracing::info!(url = %request.url, "submission rejected as duplicate");
                return Err(Error::Duplicate(request.url));
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    url = %request.url,
                    error = %e,
                    "duplicate check unavailable; accepting submission"
                );
            }
        }

        let mut destination = request
            .destination
            .unwrap_or_else(|| self.config.download.download_dir.clone());
        if let Some(category) = &request.category {
            destination = destination.join(sanitize_path_component(category));
        }

        let priority = request
            .priority
            .unwrap_or(self.config.download.default_priority);

        let job = Arc::new(Job::new(
            request.url,
            destination,
            request.format_hint,
            request.category,
            priority,
        ));

        self.persist_queued(&JobRecord {
            id: job.id,
            url: job.url.clone(),
            destination: job.destination.display().to_string(),
            format_hint: job.format_hint.clone(),
            category: job.category.clone(),
            priority: job.priority,
            created_at: job.created_at,
        })
        .await;

        self.state.queue.push(job.clone()).await;

        tracing::info!(
            job_id = job.id.0,
            url = %job.url,
            priority = job.priority,
            "job queued"
        );

        self.emit_event(Event::Queued {
            id: job.id,
            url: job.url.clone(),
            priority: job.priority,
        });

        self.trigger_webhooks(TriggerWebhooksParams {
            event_type: WebhookEvent::OnQueued,
            job_id: job.id,
            url: job.url.clone(),
            title: None,
            status: Status::Pending.to_string(),
            destination: None,
            error: None,
        });

        Ok(job.snapshot())
    }
}
