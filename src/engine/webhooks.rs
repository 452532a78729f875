//! Webhook notification handling.

use crate::config::WebhookEvent;
use crate::types::{Event, JobId, WebhookPayload};
use std::path::PathBuf;
use std::sync::Arc;

use super::MediaEngine;

/// Parameters for triggering webhooks
pub struct TriggerWebhooksParams {
    /// The webhook event that occurred
    pub event_type: WebhookEvent,
    /// The ID of the job
    pub job_id: JobId,
    /// The job's source URL
    pub url: String,
    /// Item title, when metadata was resolved
    pub title: Option<String>,
    /// Current job status as string
    pub status: String,
    /// Optional final path (for completed jobs)
    pub destination: Option<PathBuf>,
    /// Optional error message (for failed jobs)
    pub error: Option<String>,
}

impl MediaEngine {
    /// Trigger webhooks for a job event
    ///
    /// Sends HTTP POST requests to all configured webhooks subscribed to the
    /// given event type. Delivery is fire and forget in a spawned task so
    /// the job pipeline never waits on a slow endpoint.
    pub(crate) fn trigger_webhooks(&self, params: TriggerWebhooksParams) {
        let TriggerWebhooksParams {
            event_type,
            job_id,
            url,
            title,
            status,
            destination,
            error,
        } = params;

        // Filter to only webhooks that match this event type before cloning
        let matching_webhooks: Vec<_> = self
            .config
            .notifications
            .webhooks
            .iter()
            .filter(|w| w.events.contains(&event_type))
            .cloned()
            .collect();

        if matching_webhooks.is_empty() {
            return;
        }

        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let event_str: &'static str = match event_type {
                WebhookEvent::OnQueued => "queued",
                WebhookEvent::OnComplete => "completed",
                WebhookEvent::OnFailed => "failed",
            };

            // Build the payload once and share it across endpoints
            let payload = Arc::new(WebhookPayload {
                event: event_str.to_string(),
                job_id,
                url,
                title,
                status,
                destination,
                error,
                timestamp: chrono::Utc::now().timestamp(),
            });

            let client = reqwest::Client::new();

            for webhook in matching_webhooks {
                let mut request = client
                    .post(&webhook.url)
                    .json(payload.as_ref())
                    .timeout(webhook.timeout);

                if let Some(auth) = &webhook.auth_header {
                    request = request.header("Authorization", auth);
                }

                let endpoint = webhook.url;
                match request.send().await {
                    Ok(response) => {
                        if !response.status().is_success() {
                            let error_msg = format!(
                                "webhook returned status {}: {}",
                                response.status(),
                                response.text().await.unwrap_or_default()
                            );
                            tracing::warn!(url = %endpoint, error = %error_msg, "webhook failed");
                            event_tx
                                .send(Event::WebhookFailed {
                                    url: endpoint,
                                    error: error_msg,
                                })
                                .ok();
                        } else {
                            tracing::debug!(url = %endpoint, "webhook delivered");
                        }
                    }
                    Err(e) => {
                        let error_msg = format!("failed to send webhook: {}", e);
                        tracing::warn!(url = %endpoint, error = %error_msg, "webhook failed");
                        event_tx
                            .send(Event::WebhookFailed {
                                url: endpoint,
                                error: error_msg,
                            })
                            .ok();
                    }
                }
            }
        });
    }
}
