//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalSource`] using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Sorted listings**: children are returned sorted by name so walks and
//!   audit trees are deterministic across platforms.
//! - **Atomic writes**: `create_file` writes to a temp sibling and renames it
//!   over the target.
//! - **Non-directory, non-file entries** (sockets, broken symlinks) are skipped.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docsync_core::ports::{DirListing, ILocalSource, LocalFileEntry};
use tracing::{debug, instrument, trace};

/// Adapter that bridges the [`ILocalSource`] port to the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn temp_sibling(target: &Path) -> PathBuf {
        let mut p = target.as_os_str().to_owned();
        p.push(".docsync-tmp");
        PathBuf::from(p)
    }
}

#[async_trait::async_trait]
impl ILocalSource for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn list_children(&self, path: &Path) -> anyhow::Result<DirListing> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut listing = DirListing::default();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks; a dangling link has no metadata.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) => {
                    trace!(%name, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if metadata.is_dir() {
                listing.folders.push(name);
            } else if metadata.is_file() {
                let modified: DateTime<Utc> = metadata.modified()?.into();
                listing.files.push(LocalFileEntry { name, modified });
            }
        }

        listing.folders.sort();
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            folders = listing.folders.len(),
            files = listing.files.len(),
            "directory listed"
        );
        Ok(listing)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_dir(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(path).await?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(path = %path.display(), bytes = bytes.len()))]
    async fn create_file(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<DateTime<Utc>> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = Self::temp_sibling(path);
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        let modified = tokio::fs::metadata(path).await?.modified()?;
        debug!("file written");
        Ok(modified.into())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn delete_file(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_file(path).await?;
        debug!("file removed");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn delete_dir(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_dir(path).await?;
        debug!("directory removed");
        Ok(())
    }
}
