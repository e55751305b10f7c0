//! Content transfers for a single file
//!
//! Every upload or download the engine performs goes through
//! [`FileTransfer`], which updates the change-tracking state of both file
//! nodes and reports the outcome as an audit entry. Transport failures are
//! logged and reported, never propagated.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use docsync_core::config::{has_forbidden_extension, Config};
use docsync_core::domain::{
    AuditNode, LocalFile, LocalFileState, ReasonCode, RemoteFile, RemoteFileState, RemoteId,
    Selection, SyncStatus, TrackedState,
};
use docsync_core::ports::{DownloadReceipt, IRemoteSource, UploadReceipt};

use crate::error::ConflictError;

pub struct FileTransfer {
    remote: Arc<dyn IRemoteSource>,
    forbidden_extensions: Vec<String>,
}

impl FileTransfer {
    pub fn new(remote: Arc<dyn IRemoteSource>, forbidden_extensions: Vec<String>) -> Self {
        Self {
            remote,
            forbidden_extensions,
        }
    }

    /// Takes the forbidden extensions from `sync.forbidden_extensions`
    pub fn from_config(remote: Arc<dyn IRemoteSource>, config: &Config) -> Self {
        Self::new(remote, config.sync.forbidden_extensions.clone())
    }

    /// True when the file's extension may never be uploaded
    pub fn is_forbidden(&self, file_name: &str) -> bool {
        has_forbidden_extension(&self.forbidden_extensions, file_name)
    }

    /// Uploads local content over an existing remote document
    pub async fn push(
        &self,
        local: &mut LocalFile,
        remote: &mut RemoteFile,
        folder: &RemoteId,
    ) -> AuditNode {
        let name = local.name().to_string();
        if let Err(e) = self.check_allowed(local) {
            warn!(file = %name, error = %e, "Upload refused");
            return AuditNode::file(name, SyncStatus::Error, SyncStatus::NotSynced)
                .with_reason(ReasonCode::ForbiddenExtension);
        }

        match self.upload(local, folder).await {
            Ok(receipt) => {
                let unchanged = remote.state().last_synced_version == Some(receipt.version);
                local.state_mut().mark_caught_up();
                apply_receipt(remote.state_mut(), &receipt);
                info!(file = %name, version = receipt.version, unchanged, "Pushed local content");
                let remote_status = if unchanged {
                    SyncStatus::NoChanges
                } else {
                    SyncStatus::Synced
                };
                AuditNode::file(name, SyncStatus::Synced, remote_status)
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Push failed");
                AuditNode::file(name, SyncStatus::NotSynced, SyncStatus::Error)
                    .with_reason(ReasonCode::TransportError)
            }
        }
    }

    /// Downloads remote content over an existing local file
    pub async fn pull(&self, local: &mut LocalFile, remote: &mut RemoteFile) -> AuditNode {
        let name = remote.name().to_string();
        let dest = local.state().path.clone();

        match self.download(remote, dest).await {
            Ok(receipt) => {
                let state = local.state_mut();
                state.observed_at = Some(receipt.modified_at);
                state.last_synced_at = Some(receipt.modified_at);
                remote.state_mut().mark_caught_up();
                info!(file = %name, "Pulled remote content");
                AuditNode::file(name, SyncStatus::Synced, SyncStatus::NoChanges)
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Pull failed");
                AuditNode::file(name, SyncStatus::Error, SyncStatus::NotSynced)
                    .with_reason(ReasonCode::TransportError)
            }
        }
    }

    /// Uploads a local file that has no remote counterpart yet
    ///
    /// On success the local state is caught up and the new remote node is
    /// returned for the caller to attach.
    pub async fn upload_new(
        &self,
        local: &mut LocalFile,
        folder: &RemoteId,
    ) -> (AuditNode, Option<RemoteFile>) {
        let name = local.name().to_string();
        if let Err(e) = self.check_allowed(local) {
            warn!(file = %name, error = %e, "Upload refused");
            let entry = AuditNode::file(name, SyncStatus::Error, SyncStatus::NotExisting)
                .with_reason(ReasonCode::ForbiddenExtension);
            return (entry, None);
        }

        match self.upload(local, folder).await {
            Ok(receipt) => {
                local.state_mut().mark_caught_up();
                let mut state = RemoteFileState::listed(receipt.id, receipt.version, None);
                apply_receipt(&mut state, &receipt);
                let created = RemoteFile::new(name.clone(), local.selection(), state);
                info!(file = %name, id = %receipt.id, "Uploaded new document");
                (AuditNode::file(name, SyncStatus::Synced, SyncStatus::Synced), Some(created))
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Upload failed");
                let entry = AuditNode::file(name, SyncStatus::NotSynced, SyncStatus::Error)
                    .with_reason(ReasonCode::TransportError);
                (entry, None)
            }
        }
    }

    /// Downloads a remote document that has no local counterpart yet into `dest`
    pub async fn download_new(
        &self,
        remote: &mut RemoteFile,
        dest: PathBuf,
    ) -> (AuditNode, Option<LocalFile>) {
        let name = remote.name().to_string();

        match self.download(remote, dest.clone()).await {
            Ok(receipt) => {
                remote.state_mut().mark_caught_up();
                let state = LocalFileState {
                    path: dest,
                    observed_at: Some(receipt.modified_at),
                    last_synced_at: Some(receipt.modified_at),
                };
                let created = LocalFile::new(name.clone(), remote.selection(), state);
                info!(file = %name, "Downloaded new document");
                (AuditNode::file(name, SyncStatus::Synced, SyncStatus::Synced), Some(created))
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Download failed");
                let entry = AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::Error)
                    .with_reason(ReasonCode::TransportError);
                (entry, None)
            }
        }
    }

    /// Refuses forbidden files and excludes them from further runs
    fn check_allowed(&self, local: &mut LocalFile) -> Result<(), ConflictError> {
        if self.is_forbidden(local.name()) {
            local.set_selection(Selection::Exclude);
            return Err(ConflictError::ForbiddenExtension(local.name().to_string()));
        }
        Ok(())
    }

    async fn upload(
        &self,
        local: &LocalFile,
        folder: &RemoteId,
    ) -> Result<UploadReceipt, ConflictError> {
        self.remote
            .upload_document(&local.state().path, folder)
            .await
            .map_err(|e| ConflictError::TransferFailed(format!("upload {}: {e}", local.name())))
    }

    async fn download(
        &self,
        remote: &RemoteFile,
        dest: PathBuf,
    ) -> Result<DownloadReceipt, ConflictError> {
        self.remote
            .download_document(&remote.state().id, &dest)
            .await
            .map_err(|e| ConflictError::TransferFailed(format!("download {}: {e}", remote.name())))
    }
}

fn apply_receipt(state: &mut RemoteFileState, receipt: &UploadReceipt) {
    state.id = receipt.id;
    state.version = Some(receipt.version);
    state.last_synced_version = Some(receipt.version);
    state.modified_at = receipt.modified_at;
}
