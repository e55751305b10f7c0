//! Link entity
//!
//! A link pairs one local root directory with one remote folder and owns the
//! persisted state of both trees between runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::newtypes::RemoteId;
use super::selection::Selection;
use super::tree::{LocalFolder, RemoteFolder};

/// Reference to the remote project that contains the link's root folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
}

/// Which way content flows for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Bidirectional,
    UploadOnly,
    DownloadOnly,
    Disabled,
}

impl SyncDirection {
    pub fn from_flags(upload: bool, download: bool) -> Self {
        match (upload, download) {
            (true, true) => SyncDirection::Bidirectional,
            (true, false) => SyncDirection::UploadOnly,
            (false, true) => SyncDirection::DownloadOnly,
            (false, false) => SyncDirection::Disabled,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncDirection::Bidirectional => "bidirectional",
            SyncDirection::UploadOnly => "upload_only",
            SyncDirection::DownloadOnly => "download_only",
            SyncDirection::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

/// A configured local/remote pairing and the state of both of its trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    name: String,
    active: bool,
    sync_upload: bool,
    sync_download: bool,
    local_root: PathBuf,
    remote_root_id: RemoteId,
    project: ProjectRef,
    local_tree: LocalFolder,
    remote_tree: RemoteFolder,
}

impl Link {
    /// Creates an active bidirectional link with empty, fully included trees
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` for an empty name and
    /// `DomainError::InvalidPath` when `local_root` is not absolute.
    pub fn new(
        name: impl Into<String>,
        local_root: impl Into<PathBuf>,
        remote_root_id: RemoteId,
        project: ProjectRef,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let local_root = local_root.into();

        if name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "link name must not be empty".to_string(),
            ));
        }
        if !local_root.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "local root must be absolute: {}",
                local_root.display()
            )));
        }

        let root_name = local_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        let local_tree = LocalFolder::new(root_name, local_root.clone(), Selection::Include);
        let remote_tree = RemoteFolder::new(project.name.clone(), remote_root_id, Selection::Include);

        Ok(Self {
            name,
            active: true,
            sync_upload: true,
            sync_download: true,
            local_root,
            remote_root_id,
            project,
            local_tree,
            remote_tree,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn sync_upload(&self) -> bool {
        self.sync_upload
    }

    pub fn sync_download(&self) -> bool {
        self.sync_download
    }

    pub fn set_directions(&mut self, upload: bool, download: bool) {
        self.sync_upload = upload;
        self.sync_download = download;
    }

    pub fn direction(&self) -> SyncDirection {
        SyncDirection::from_flags(self.sync_upload, self.sync_download)
    }

    pub fn local_root(&self) -> &PathBuf {
        &self.local_root
    }

    pub fn remote_root_id(&self) -> RemoteId {
        self.remote_root_id
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn local_tree(&self) -> &LocalFolder {
        &self.local_tree
    }

    pub fn remote_tree(&self) -> &RemoteFolder {
        &self.remote_tree
    }

    /// Both trees, mutably, for one reconciliation pass
    pub fn trees_mut(&mut self) -> (&mut LocalFolder, &mut RemoteFolder) {
        (&mut self.local_tree, &mut self.remote_tree)
    }

    pub fn local_tree_mut(&mut self) -> &mut LocalFolder {
        &mut self.local_tree
    }

    pub fn remote_tree_mut(&mut self) -> &mut RemoteFolder {
        &mut self.remote_tree
    }

    /// Rebuilds a link from stored parts; used by link stores
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        name: String,
        active: bool,
        sync_upload: bool,
        sync_download: bool,
        local_root: PathBuf,
        remote_root_id: RemoteId,
        project: ProjectRef,
        local_tree: LocalFolder,
        remote_tree: RemoteFolder,
    ) -> Self {
        Self {
            name,
            active,
            sync_upload,
            sync_download,
            local_root,
            remote_root_id,
            project,
            local_tree,
            remote_tree,
        }
    }
}
