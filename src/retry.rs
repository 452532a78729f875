//! Retry classification and exponential backoff
//!
//! Transient resolution/transfer failures are retried by re-queueing the job
//! after a backoff delay rather than looping inside a worker slot; this
//! module provides the error classification and the delay computation the
//! engine's retry scheduler uses.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, server busy, connection reset) should return `true`.
/// Permanent failures (illegal state, duplicate submission, cancellation) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the job should be re-queued
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // The resolver could not identify the content; platforms throttle
            // and hiccup, so give it another chance
            Error::Resolution(_) => true,
            // Network/IO failure mid-transfer is the classic transient case
            Error::Transfer(_) => true,
            // I/O errors can be retryable in some cases
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Explicit cancel/pause is never retried
            Error::Cancelled => false,
            // Duplicate submissions are rejected, not failures of the engine
            Error::Duplicate(_) => false,
            // An empty crawl is terminal by definition
            Error::NoItemsFound(_) => false,
            // State machine violations are caller errors
            Error::Job(_) => false,
            // Store failures are logged and swallowed, never retried as jobs
            Error::Persistence(_) | Error::Sqlx(_) => false,
            // Shutdown in progress - not retryable
            Error::ShuttingDown => false,
            // Serialization errors are permanent
            Error::Serialization(_) => false,
            // Unknown errors - be conservative and don't retry
            Error::Other(_) => false,
        }
    }
}

/// Compute the backoff delay for a given failure count
///
/// Delay grows exponentially: `base * 2^attempts`, capped at
/// `config.max_delay`. `attempts` is the number of failures so far (1 after
/// the first failure), matching the spec'd schedule of 2x base after one
/// failure, 4x after two, and so on.
pub fn backoff_delay(config: &RetryConfig, attempts: u32) -> Duration {
    let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
    let delay = config
        .base_delay
        .checked_mul(factor)
        .unwrap_or(config.max_delay);
    delay.min(config.max_delay)
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
pub fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;

    #[test]
    fn backoff_grows_exponentially() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            jitter: false,
        };

        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(&config, 3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: false,
        };

        assert_eq!(backoff_delay(&config, 4), Duration::from_secs(16));
        assert_eq!(backoff_delay(&config, 5), Duration::from_secs(30));
        assert_eq!(backoff_delay(&config, 20), Duration::from_secs(30));
        // Large attempt counts must not overflow
        assert_eq!(backoff_delay(&config, u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn resolution_and_transfer_errors_are_retryable() {
        assert!(Error::Resolution("extractor timed out".to_string()).is_retryable());
        assert!(Error::Transfer("connection reset by peer".to_string()).is_retryable());
    }

    #[test]
    fn io_transient_kinds_are_retryable() {
        let timeout = Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(timeout.is_retryable());

        let reset = Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(reset.is_retryable());

        let not_found = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not found",
        ));
        assert!(!not_found.is_retryable());

        let denied = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(
            !denied.is_retryable(),
            "PermissionDenied is permanent, not transient"
        );
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::Duplicate("already downloaded".to_string()).is_retryable());
        assert!(!Error::NoItemsFound("empty channel".to_string()).is_retryable());
        assert!(!Error::ShuttingDown.is_retryable());
        assert!(!Error::Persistence("store offline".to_string()).is_retryable());
        assert!(
            !Error::Job(JobError::InvalidState {
                id: 1,
                operation: "pause".to_string(),
                current_state: "completed".to_string(),
            })
            .is_retryable()
        );
    }

    #[test]
    fn add_jitter_stays_within_bounds_over_many_iterations() {
        let delay = Duration::from_millis(50);
        // Run enough iterations that a bounds violation would almost certainly surface
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay {:?}",
                delay * 2
            );
        }
    }

    #[test]
    fn add_jitter_on_zero_delay_returns_zero() {
        let jittered = add_jitter(Duration::ZERO);
        assert_eq!(
            jittered,
            Duration::ZERO,
            "jitter on zero delay should remain zero"
        );
    }
}
