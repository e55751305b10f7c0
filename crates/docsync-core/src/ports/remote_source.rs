//! Remote source port (driven/secondary port)
//!
//! The document service side of a link: folders addressed by id, documents
//! carrying a monotonic version counter.
//!
//! ## Design Notes
//!
//! - Authentication, HTTP and transport-level retries belong to the
//!   implementation; the engine calls each method once per decision.
//! - The DTOs here are port-level and mapped onto tree nodes by the refresh
//!   pass in `docsync-sync`.
//! - `upload_document` to a folder that already holds a document of the
//!   same name creates a new version of it. When the service finds the
//!   content identical it returns the unchanged version.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::newtypes::RemoteId;

/// A subfolder in a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolderEntry {
    pub id: RemoteId,
    pub name: String,
}

/// A document in a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocumentEntry {
    pub id: RemoteId,
    pub name: String,
    pub version: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Immediate children of one remote folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    pub folders: Vec<RemoteFolderEntry>,
    pub documents: Vec<RemoteDocumentEntry>,
}

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub id: RemoteId,
    pub version: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Result of a download: the modification time of the written local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReceipt {
    pub modified_at: DateTime<Utc>,
}

/// Port trait for the remote document service
#[async_trait]
pub trait IRemoteSource: Send + Sync {
    /// Lists the subfolders and documents directly inside folder `id`
    async fn list_folder(&self, id: &RemoteId) -> anyhow::Result<FolderListing>;

    /// Creates a subfolder and returns its id
    async fn create_folder(&self, parent: &RemoteId, name: &str) -> anyhow::Result<RemoteId>;

    /// Uploads the local file at `path` into folder `folder`
    async fn upload_document(&self, path: &Path, folder: &RemoteId)
        -> anyhow::Result<UploadReceipt>;

    /// Downloads document `id` to `dest`, overwriting it
    async fn download_document(&self, id: &RemoteId, dest: &Path)
        -> anyhow::Result<DownloadReceipt>;

    /// Deletes a document; `Ok(false)` when the service refused
    async fn delete_document(&self, id: &RemoteId) -> anyhow::Result<bool>;

    /// Deletes a folder; `Ok(false)` when the service refused
    async fn delete_folder(&self, id: &RemoteId) -> anyhow::Result<bool>;
}
