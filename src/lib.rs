//! # media-dl
//!
//! Embeddable backend library for media download applications.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Platform-agnostic** - All content resolution goes through an injected
//!   [`MediaResolver`]; the engine never speaks any platform's wire protocol
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Failure-tolerant** - Transient failures retry with exponential
//!   backoff, and an unavailable persistence store never fails a download
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaEngine, SubmitRequest};
//! use std::sync::Arc;
//!
//! # async fn example(resolver: Arc<dyn media_dl::MediaResolver>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MediaEngine::with_sqlite(Config::default(), resolver).await?;
//!
//! // Subscribe to events
//! let mut events = engine.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! // Start the worker pool and submit a download
//! engine.start().await;
//! let job = engine
//!     .submit(SubmitRequest::new("https://example.com/watch?v=abc"))
//!     .await?;
//! println!("queued job {}", job.id);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Metadata caching
pub mod cache;
/// Configuration types
pub mod config;
/// Core engine implementation (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Persistence collaborator contract
pub mod persistence;
/// Resolution service contract
pub mod resolver;
/// Retry classification and backoff
pub mod retry;
/// Bundled SQLite persistence collaborator
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use cache::MetadataCache;
pub use config::{Config, NotificationConfig, RetryConfig, WebhookConfig, WebhookEvent};
pub use engine::{BatchRequest, MediaEngine, SubmitRequest};
pub use error::{Error, JobError, Result};
pub use persistence::{HistoryEntry, JobRecord, JobStore, StatusDetail};
pub use resolver::{MaterializeRequest, MediaResolver, ProgressFn, TransferUpdate};
pub use store::SqliteStore;
pub use types::{DiscoveredItem, Event, JobId, JobSnapshot, Metadata, Status};

/// Helper function to run the engine with graceful signal handling.
///
/// Waits for a termination signal and then calls the engine's
/// [`shutdown`](MediaEngine::shutdown) method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaEngine, run_with_shutdown};
/// use std::sync::Arc;
///
/// # async fn example(resolver: Arc<dyn media_dl::MediaResolver>) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = MediaEngine::with_sqlite(Config::default(), resolver).await?;
/// engine.start().await;
///
/// // Run with automatic signal handling
/// run_with_shutdown(engine).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(engine: MediaEngine) -> Result<()> {
    wait_for_signal().await;
    engine.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
