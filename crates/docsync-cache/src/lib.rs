//! docsync Cache - Link persistence
//!
//! SQLite-based storage for configured links, including the bookkeeping of
//! both trees (selection, tombstones, observed and last-synced timestamps,
//! versions) between runs.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteLinkStore`] - `ILinkStore` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use docsync_cache::{DatabasePool, SqliteLinkStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/docsync/links.db")).await?;
//! let store = SqliteLinkStore::new(pool.pool().clone());
//! // Use store as ILinkStore...
//! # Ok(())
//! # }
//! ```

pub mod link_store;
pub mod pool;

pub use link_store::SqliteLinkStore;
pub use pool::DatabasePool;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Another link already mirrors the same local directory
    #[error("Local root already linked: {0}")]
    DuplicateRoot(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
