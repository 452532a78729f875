//! Database lifecycle and schema migrations.

use crate::error::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::SqliteStore;

impl SqliteStore {
    /// Open (or create) the database at the given path and run migrations
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Persistence(format!("failed to create database directory: {}", e))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Persistence(format!("failed to parse database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Persistence(format!("failed to connect to database: {}", e)))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::Persistence(format!("failed to acquire connection: {}", e)))?;

        // Create schema version table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Persistence(format!("failed to create schema_version table: {}", e)))?;

        // Check current version
        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| Error::Persistence(format!("failed to query schema version: {}", e)))?;

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: jobs table plus history table with the duplicate-URL index
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        sqlx::query(
            r#"
            CREATE TABLE jobs (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL,
                destination TEXT NOT NULL,
                format_hint TEXT,
                category TEXT,
                priority INTEGER NOT NULL DEFAULT 0,
                status INTEGER NOT NULL DEFAULT 0,
                progress REAL NOT NULL DEFAULT 0.0,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                started_at INTEGER,
                completed_at INTEGER
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Persistence(format!("failed to create jobs table: {}", e)))?;

        sqlx::query("CREATE INDEX idx_jobs_status ON jobs (status)")
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Persistence(format!("failed to create jobs index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL,
                source_url TEXT NOT NULL,
                title TEXT,
                uploader TEXT,
                category TEXT,
                status INTEGER NOT NULL,
                final_path TEXT,
                error_message TEXT,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                completed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Persistence(format!("failed to create history table: {}", e)))?;

        // The duplicate check is a point lookup by URL on every submission
        sqlx::query("CREATE INDEX idx_history_source_url ON history (source_url)")
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Persistence(format!("failed to create history index: {}", e)))?;

        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (1, ?)")
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Persistence(format!("failed to record migration v1: {}", e)))?;

        Ok(())
    }
}
