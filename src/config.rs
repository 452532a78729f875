//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Download behavior configuration (directories, concurrency, priority)
///
/// Groups settings related to how jobs are fetched and stored.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent downloads, i.e. worker pool size (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Priority assigned to submissions that don't specify one (default: 0)
    #[serde(default)]
    pub default_priority: i32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            default_priority: 0,
        }
    }
}

/// Retry behavior for transient job failures
///
/// A failed job is re-queued after `base_delay * 2^attempts` (capped at
/// `max_delay`), until `max_attempts` failures make it terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum failure attempts before a job is terminally failed (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay (default: 1s)
    #[serde(default = "default_base_delay", with = "duration_secs")]
    pub base_delay: Duration,

    /// Cap applied to the exponential backoff delay (default: 5 minutes)
    #[serde(default = "default_max_delay", with = "duration_secs")]
    pub max_delay: Duration,

    /// Add random jitter to backoff delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: false,
        }
    }
}

/// Metadata cache behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a resolved metadata entry stays fresh (default: 10 minutes)
    #[serde(default = "default_metadata_ttl", with = "duration_secs")]
    pub metadata_ttl: Duration,

    /// Sweep expired entries after this many completed jobs (default: 16)
    #[serde(default = "default_purge_every")]
    pub purge_every_completed: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata_ttl: default_metadata_ttl(),
            purge_every_completed: default_purge_every(),
        }
    }
}

/// Data storage settings for the bundled SQLite store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Notification configuration (webhooks)
///
/// Groups settings for external notifications triggered by job events.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook configurations
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

/// A single webhook endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL (receives a JSON POST)
    pub url: String,

    /// Events this webhook subscribes to
    #[serde(default = "default_webhook_events")]
    pub events: Vec<WebhookEvent>,

    /// Request timeout (default: 10s)
    #[serde(default = "default_webhook_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Optional Authorization header value
    #[serde(default)]
    pub auth_header: Option<String>,
}

/// Job events a webhook can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    /// Job accepted into the queue
    OnQueued,
    /// Job completed successfully
    OnComplete,
    /// Job terminally failed
    OnFailed,
}

/// Main configuration for [`MediaEngine`](crate::MediaEngine)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — directory, concurrency, default priority
/// - [`retry`](RetryConfig) — backoff policy for transient failures
/// - [`cache`](CacheConfig) — metadata cache TTL and purge cadence
/// - [`persistence`](PersistenceConfig) — bundled SQLite store location
/// - [`notifications`](NotificationConfig) — webhook endpoints
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Retry/backoff policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Metadata cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Notification settings (webhooks)
    #[serde(flatten)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(300)
}

fn default_metadata_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_purge_every() -> u64 {
    16
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./media-dl.db")
}

fn default_webhook_events() -> Vec<WebhookEvent> {
    vec![WebhookEvent::OnComplete, WebhookEvent::OnFailed]
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Serialize durations as whole seconds for readable config files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
