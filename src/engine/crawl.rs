//! Batch crawling of collection URLs (channels, playlists).
//!
//! A crawl fans out over the resolver's sub-categories concurrently, filters
//! already-downloaded members, and submits the rest as individual jobs. One
//! failing sub-category never aborts the others; the summary event makes
//! partial failure visible without interrupting the crawl.

use crate::error::{Error, Result};
use crate::types::{Event, JobSnapshot};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use super::MediaEngine;
use super::submit::SubmitRequest;

/// Parameters for submitting a batch crawl
#[derive(Clone, Debug, Default)]
pub struct BatchRequest {
    /// Collection URL to crawl (channel or playlist)
    pub collection_url: String,
    /// Destination directory for member jobs (defaults to the configured
    /// download directory; each member lands in a per-category sub-directory)
    pub destination: Option<PathBuf>,
    /// Priority applied to every member job
    pub priority: Option<i32>,
    /// Format/quality selector applied to every member job
    pub format_hint: Option<String>,
}

impl BatchRequest {
    /// Crawl of a collection URL with engine defaults for everything else
    pub fn new(collection_url: impl Into<String>) -> Self {
        Self {
            collection_url: collection_url.into(),
            ..Default::default()
        }
    }
}

impl MediaEngine {
    /// Crawl a collection URL and submit its members as individual jobs
    ///
    /// All resolver sub-categories are queried concurrently; each category
    /// result stands on its own, so a failing category only shows up in the
    /// summary while the others still produce jobs. Members already recorded
    /// as downloaded are skipped. Returns the newly submitted jobs, or
    /// [`Error::NoItemsFound`] when every category came back empty.
    pub async fn submit_batch(&self, request: BatchRequest) -> Result<Vec<JobSnapshot>> {
        if !self.state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let collection_url = request.collection_url.clone();
        let categories = self.resolver.batch_categories();

        tracing::info!(
            url = %collection_url,
            categories = categories.len(),
            "starting batch crawl"
        );

        // Fan out over all sub-categories at once; partial failures stay partial
        let listings = futures::future::join_all(categories.into_iter().map(|category| {
            let url = collection_url.clone();
            async move {
                let result = self.resolver.list_members(&url, &category).await;
                (category, result)
            }
        }))
        .await;

        let mut total_found = 0usize;
        let mut skipped_duplicate = 0usize;
        let mut failed_categories = Vec::new();
        let mut submitted = Vec::new();

        for (category, result) in listings {
            let members = match result {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!(
                        url = %collection_url,
                        category = %category,
                        error = %e,
                        "sub-category listing failed"
                    );
                    failed_categories.push(category);
                    continue;
                }
            };

            total_found += members.len();

            for member in members {
                let member_url = canonical_member_url(&collection_url, &member.url);
                let submit = SubmitRequest {
                    url: member_url,
                    destination: request.destination.clone(),
                    priority: request.priority,
                    format_hint: request.format_hint.clone(),
                    category: Some(category.clone()),
                };

                match self.submit(submit).await {
                    Ok(snapshot) => submitted.push(snapshot),
                    Err(Error::Duplicate(url)) => {
                        tracing::debug!(url = %url, "crawl member already downloaded; skipping");
                        skipped_duplicate += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            category = %category,
                            error = %e,
                            "crawl member submission failed"
                        );
                    }
                }
            }
        }

        if total_found == 0 {
            tracing::warn!(url = %collection_url, "batch crawl found no members");
            return Err(Error::NoItemsFound(collection_url));
        }

        tracing::info!(
            url = %collection_url,
            total_found,
            added = submitted.len(),
            skipped_duplicate,
            failed = failed_categories.len(),
            "batch crawl complete"
        );

        self.emit_event(Event::BatchSummary {
            collection_url,
            total_found,
            added: submitted.len(),
            skipped_duplicate,
            failed_categories,
        });

        Ok(submitted)
    }
}

/// Derive the canonical URL for a discovered member
///
/// Absolute URLs are normalized (fragment stripped); relative URLs are
/// resolved against the collection URL. Anything unparseable passes through
/// untouched and is left for the resolver to reject.
fn canonical_member_url(collection_url: &str, member_url: &str) -> String {
    match url::Url::parse(member_url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => url::Url::parse(collection_url)
            .and_then(|base| base.join(member_url))
            .map(|mut joined| {
                joined.set_fragment(None);
                joined.to_string()
            })
            .unwrap_or_else(|_| member_url.to_string()),
        Err(_) => member_url.to_string(),
    }
}
