//! Graceful shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::MediaEngine;

/// How long shutdown waits for in-flight jobs before giving up on the join
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

impl MediaEngine {
    /// Gracefully shut down the engine
    ///
    /// The shutdown sequence:
    /// 1. Stop accepting new submissions
    /// 2. Signal the task queue so every blocked `pop` returns the shutdown
    ///    indication — pending jobs stay queued, unprocessed
    /// 3. Wait for workers to finish their current job (not interrupted
    ///    mid-transfer), with a timeout
    /// 4. Emit the `Shutdown` event
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");

        self.state.accepting_new.store(false, Ordering::SeqCst);
        self.state.queue.shut_down();

        let handles: Vec<_> = {
            let mut workers = self.state.workers.lock().await;
            workers.drain(..).collect()
        };

        let worker_count = handles.len();
        let join_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "worker task ended abnormally");
                }
            }
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all).await {
            Ok(()) => {
                tracing::info!(worker_count, "all workers exited");
            }
            Err(_) => {
                tracing::warn!(
                    worker_count,
                    "timeout waiting for workers; proceeding with shutdown"
                );
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("graceful shutdown complete");

        Ok(())
    }
}
