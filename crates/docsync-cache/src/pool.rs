//! Database connection pool for the link store
//!
//! A link database lives either in a file (the CLI) or in memory (tests).
//! File databases use WAL so `docsync link list` can read while a scheduled
//! run is saving. The schema is tracked with SQLite's `user_version` pragma
//! and only applied when the stored version is behind [`SCHEMA_VERSION`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Version written to `user_version` once the `links` schema is in place
pub const SCHEMA_VERSION: i64 = 1;

const LINKS_SCHEMA: &str = include_str!("migrations/20240601_links.sql");

/// Where a link database lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    /// Private to one connection, so the pool is capped at one
    Memory,
}

impl Location {
    fn max_connections(&self) -> u32 {
        match self {
            Location::File(_) => 4,
            Location::Memory => 1,
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match self {
            Location::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            Location::Memory => SqliteConnectOptions::new().filename(":memory:"),
        };
        options.busy_timeout(Duration::from_secs(5))
    }
}

/// Pool of SQLite connections holding the `links` table
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the database file at `db_path`, creating it and its directory
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` when the directory or the database
    /// cannot be opened, `CacheError::MigrationFailed` when the schema
    /// cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Self::open(Location::File(db_path.to_path_buf())).await
    }

    /// Opens a fresh in-memory database
    pub async fn in_memory() -> Result<Self, CacheError> {
        Self::open(Location::Memory).await
    }

    async fn open(location: Location) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(location.max_connections())
            .connect_with(location.connect_options())
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to open {location:?}: {e}"))
            })?;

        let db = Self { pool };
        let applied = db.migrate().await?;

        match &location {
            Location::File(path) => tracing::info!(
                path = %path.display(),
                migrated = applied,
                "Link database opened"
            ),
            Location::Memory => tracing::debug!("In-memory link database opened"),
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema version stored in the database file
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Applies the schema when the stored version is behind; returns whether it ran
    async fn migrate(&self) -> Result<bool, CacheError> {
        let current = self
            .schema_version()
            .await
            .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
        if current >= SCHEMA_VERSION {
            return Ok(false);
        }

        // PRAGMA does not take bound parameters
        let script = format!("{LINKS_SCHEMA}\nPRAGMA user_version = {SCHEMA_VERSION};");
        sqlx::raw_sql(&script)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CacheError::MigrationFailed(format!(
                    "Failed to move links schema from version {current} to {SCHEMA_VERSION}: {e}"
                ))
            })?;

        tracing::debug!(from = current, to = SCHEMA_VERSION, "Links schema migrated");
        Ok(true)
    }
}
