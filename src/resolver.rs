//! Resolution service contract
//!
//! The engine is independent of any specific content platform; everything
//! platform-facing goes through [`MediaResolver`]. Implementations typically
//! wrap an extractor binary or library (the engine treats the calls as
//! opaque, blocking, cancellable and retryable).

use crate::error::Result;
use crate::types::{DiscoveredItem, Metadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// A progress/phase update reported by [`MediaResolver::materialize`]
#[derive(Clone, Debug)]
pub enum TransferUpdate {
    /// Bytes are moving
    Progress {
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes expected, 0 if unknown
        total_bytes: u64,
        /// Current transfer rate in bytes per second
        speed_bps: u64,
        /// Estimated seconds remaining, if known
        eta_secs: Option<u64>,
    },
    /// Transfer finished; post-processing (e.g. stream merge) is starting.
    /// After this update no more network I/O happens for the job.
    PostProcessing,
}

/// Callback invoked by the resolver for every transfer update
pub type ProgressFn<'a> = &'a (dyn Fn(TransferUpdate) + Send + Sync);

/// Parameters for a materialization call
#[derive(Clone, Debug)]
pub struct MaterializeRequest<'a> {
    /// Source URL
    pub url: &'a str,
    /// Destination directory
    pub destination: &'a Path,
    /// Optional format/quality selector
    pub format_hint: Option<&'a str>,
}

/// External service that turns URLs into metadata and materialized files
///
/// Calls may block for long periods; the engine never holds an engine-wide
/// lock across them. `materialize` must observe the cancellation token and
/// return [`Error::Cancelled`](crate::Error::Cancelled) promptly when it
/// fires; partial output may be left in place.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolve canonical identity and metadata for a URL without downloading
    async fn resolve_metadata(&self, url: &str) -> Result<Metadata>;

    /// Stream the content behind a URL to disk, reporting progress along the
    /// way, and return the final materialized path
    async fn materialize(
        &self,
        request: MaterializeRequest<'_>,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Sub-categories a collection URL fans out into during a batch crawl
    /// (e.g. `["videos", "shorts", "streams"]` for a channel-style resolver)
    fn batch_categories(&self) -> Vec<String> {
        vec!["items".to_string()]
    }

    /// List the member items of one sub-category of a collection URL
    async fn list_members(
        &self,
        collection_url: &str,
        category: &str,
    ) -> Result<Vec<DiscoveredItem>>;
}
