//! Local source port (driven/secondary port)
//!
//! Lists and mutates the directory tree a link mirrors on disk.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - Calls are not retried at this layer; a failed listing marks the folder's
//!   local side as `Error` for the current run.
//! - Paths are absolute; the tree model stores them on every local node.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A regular file seen in a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// Immediate children of one directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    /// Names of subdirectories
    pub folders: Vec<String>,
    /// Regular files with their modification time
    pub files: Vec<LocalFileEntry>,
}

/// Port trait for the local directory tree
#[async_trait]
pub trait ILocalSource: Send + Sync {
    /// Lists the subdirectories and regular files directly under `path`
    async fn list_children(&self, path: &Path) -> anyhow::Result<DirListing>;

    /// Creates a directory; succeeds if it already exists
    async fn create_dir(&self, path: &Path) -> anyhow::Result<()>;

    /// Writes `bytes` to a new or existing file and returns its modification time
    async fn create_file(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<DateTime<Utc>>;

    /// Removes a regular file
    async fn delete_file(&self, path: &Path) -> anyhow::Result<()>;

    /// Removes an empty directory
    async fn delete_dir(&self, path: &Path) -> anyhow::Result<()>;
}
