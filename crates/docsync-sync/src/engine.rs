//! Reconciliation engine
//!
//! The [`SyncEngine`] brings the two trees of a link into agreement.
//!
//! ## Link Sync Flow
//!
//! 1. **Refresh**: list both trees from their sources, recording failures
//! 2. **Selection**: re-establish the tri-state invariant on both roots
//! 3. **Walk**: match children by name, depth-first, and act on each pair
//!
//! ## Walk Modes
//!
//! The same walk serves all directions. [`WalkMode::Both`] is the
//! bidirectional reconciliation; [`WalkMode::Push`] and [`WalkMode::Pull`]
//! only let the local or remote tree act. The bidirectional walk switches
//! to a one-directional mode for a pair where only one side is eligible.
//!
//! A folder whose refresh failed gets `Error` on the failing side and is
//! not descended into. Every processed node yields exactly one audit entry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use docsync_conflict::FileConflictResolver;
use docsync_core::domain::{
    reconcile_selection, AuditNode, FileSyncState, Link, Local, LocalFile, LocalFolder, ReasonCode,
    Remote, RemoteFile, RemoteFolder, Side, SyncDirection, SyncStatus,
};
use docsync_core::ports::{ILocalSource, IRemoteSource};

use crate::context::SyncContext;
use crate::deletion::{self, Disposition, LocalEraser, RemoteEraser};
use crate::refresh::{self, join_rel};
use crate::SyncError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which tree may act during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Both trees act
    Both,
    /// Only the local tree acts: creations, uploads and deletions go remote
    Push,
    /// Only the remote tree acts
    Pull,
}

/// Action for a matched folder pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderAction {
    /// Neither side is eligible
    Skip,
    /// Both replicas vanished: forget both nodes
    DropBoth,
    /// The local folder vanished: delete the remote counterpart
    DeleteRemote,
    /// The remote folder vanished: delete the local counterpart
    DeleteLocal,
    /// The counterpart on this side vanished while the other side acts: recreate it
    Recreate(Side),
    /// Walk the children
    Descend(WalkMode),
}

/// Action for a matched file pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    DropBoth,
    DeleteRemote,
    DeleteLocal,
    Push,
    Pull,
    /// Hand the pair to the conflict resolver
    Resolve,
    /// Record the pair as-is
    Report(SyncStatus, SyncStatus),
}

/// Decides what to do with a matched folder pair
pub fn plan_folder_pair(mode: WalkMode, local: &LocalFolder, remote: &RemoteFolder) -> FolderAction {
    let (l_gone, r_gone) = (local.is_tombstoned(), remote.is_tombstoned());
    match mode {
        WalkMode::Both => match (local.is_to_sync(), remote.is_to_sync()) {
            (false, false) if l_gone && r_gone => FolderAction::DropBoth,
            (false, false) => FolderAction::Skip,
            (true, false) => plan_folder_pair(WalkMode::Push, local, remote),
            (false, true) => plan_folder_pair(WalkMode::Pull, local, remote),
            (true, true) => match (l_gone, r_gone) {
                (true, true) => FolderAction::DropBoth,
                (true, false) => FolderAction::DeleteRemote,
                (false, true) => FolderAction::DeleteLocal,
                (false, false) => FolderAction::Descend(WalkMode::Both),
            },
        },
        WalkMode::Push => {
            if l_gone && r_gone {
                FolderAction::DropBoth
            } else if !local.is_to_sync() {
                FolderAction::Skip
            } else if l_gone {
                FolderAction::DeleteRemote
            } else if r_gone {
                FolderAction::Recreate(Side::Remote)
            } else {
                FolderAction::Descend(WalkMode::Push)
            }
        }
        WalkMode::Pull => {
            if l_gone && r_gone {
                FolderAction::DropBoth
            } else if !remote.is_to_sync() {
                FolderAction::Skip
            } else if r_gone {
                FolderAction::DeleteLocal
            } else if l_gone {
                FolderAction::Recreate(Side::Local)
            } else {
                FolderAction::Descend(WalkMode::Pull)
            }
        }
    }
}

/// Decides what to do with a matched file pair
pub fn plan_file_pair(mode: WalkMode, local: &LocalFile, remote: &RemoteFile) -> FileAction {
    if local.is_deleted() && remote.is_deleted() {
        return FileAction::DropBoth;
    }
    let (l_state, r_state) = (local.sync_state(), remote.sync_state());
    match mode {
        WalkMode::Both => {
            if l_state == FileSyncState::Deleted {
                FileAction::DeleteRemote
            } else if r_state == FileSyncState::Deleted {
                FileAction::DeleteLocal
            } else {
                FileAction::Resolve
            }
        }
        WalkMode::Push => match l_state {
            FileSyncState::Deleted => FileAction::DeleteRemote,
            FileSyncState::Synced => FileAction::Push,
            other => FileAction::Report(other.status(), SyncStatus::NotSynced),
        },
        WalkMode::Pull => match r_state {
            FileSyncState::Deleted => FileAction::DeleteLocal,
            FileSyncState::Synced => FileAction::Pull,
            other => FileAction::Report(SyncStatus::NotSynced, other.status()),
        },
    }
}

/// Reconciles the trees of one link at a time
pub struct SyncEngine {
    local: Arc<dyn ILocalSource>,
    remote: Arc<dyn IRemoteSource>,
    resolver: FileConflictResolver,
    local_eraser: LocalEraser,
    remote_eraser: RemoteEraser,
}

impl SyncEngine {
    pub fn new(
        local: Arc<dyn ILocalSource>,
        remote: Arc<dyn IRemoteSource>,
        resolver: FileConflictResolver,
    ) -> Self {
        Self {
            local_eraser: LocalEraser(local.clone()),
            remote_eraser: RemoteEraser(remote.clone()),
            local,
            remote,
            resolver,
        }
    }

    /// Refreshes, normalizes and reconciles one link
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Transport` when neither root could be listed;
    /// every other failure is recorded on the audit entry of its node.
    #[instrument(skip(self, link, ctx), fields(link = %link.name()))]
    pub async fn sync_link(
        &self,
        link: &mut Link,
        ctx: &mut SyncContext,
    ) -> Result<AuditNode, SyncError> {
        let name = link.name().to_string();
        let direction = link.direction();
        if direction == SyncDirection::Disabled {
            info!("Both directions disabled, nothing to do");
            return Ok(AuditNode::folder(name, SyncStatus::NotSynced, SyncStatus::NotSynced));
        }

        let (local, remote) = link.trees_mut();
        let local_report = refresh::refresh_local(self.local.as_ref(), local).await;
        let remote_report = refresh::refresh_remote(self.remote.as_ref(), remote).await;
        if local_report.root_failed() && remote_report.root_failed() {
            return Err(SyncError::Transport(format!(
                "neither root of link '{name}' could be listed"
            )));
        }
        ctx.record_refresh(Side::Local, &local_report);
        ctx.record_refresh(Side::Remote, &remote_report);

        let local_selection = reconcile_selection(local);
        let remote_selection = reconcile_selection(remote);
        if local_selection.has_anomalies() || remote_selection.has_anomalies() {
            warn!(
                local = local_selection.anomalies.len(),
                remote = remote_selection.anomalies.len(),
                "Selection anomalies need review"
            );
        }

        info!(%direction, "Reconciling link");
        let mut entry = match direction {
            SyncDirection::UploadOnly => self.push_folder(ctx, local, remote).await,
            SyncDirection::DownloadOnly => self.pull_folder(ctx, local, remote).await,
            _ => self.reconcile(ctx, local, remote).await,
        };
        entry.name = name;

        let summary = entry.summary();
        info!(entries = summary.total(), failures = summary.failures(), "Link reconciled");
        Ok(entry)
    }

    /// Bidirectional reconciliation of two freshly refreshed folders
    pub async fn reconcile(
        &self,
        ctx: &mut SyncContext,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
    ) -> AuditNode {
        self.walk_root(ctx, local, remote, WalkMode::Both).await
    }

    /// One-directional pass in which only the local tree acts
    pub async fn push_folder(
        &self,
        ctx: &mut SyncContext,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
    ) -> AuditNode {
        self.walk_root(ctx, local, remote, WalkMode::Push).await
    }

    /// One-directional pass in which only the remote tree acts
    pub async fn pull_folder(
        &self,
        ctx: &mut SyncContext,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
    ) -> AuditNode {
        self.walk_root(ctx, local, remote, WalkMode::Pull).await
    }

    async fn walk_root(
        &self,
        ctx: &mut SyncContext,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        mode: WalkMode,
    ) -> AuditNode {
        let mut entry =
            AuditNode::folder(local.name(), SyncStatus::NoChanges, SyncStatus::NoChanges);
        self.walk(ctx, "", local, remote, mode, &mut entry).await;
        entry
    }

    /// Processes every child of a folder pair into `entry`
    fn walk<'a>(
        &'a self,
        ctx: &'a mut SyncContext,
        rel: &'a str,
        local: &'a mut LocalFolder,
        remote: &'a mut RemoteFolder,
        mode: WalkMode,
        entry: &'a mut AuditNode,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let (local_failed, remote_failed) = ctx.refresh_failed(rel);
            if local_failed || remote_failed {
                let side = |failed: bool, status: SyncStatus| {
                    if failed {
                        SyncStatus::Error
                    } else {
                        status
                    }
                };
                entry.set_outcome(side(local_failed, entry.local), side(remote_failed, entry.remote));
                entry.reason = Some(ReasonCode::TransportError);
                debug!(folder = %rel, "Skipping folder that failed to refresh");
                return;
            }

            let local_folders = local.folder_names();
            for name in &local_folders {
                let child_rel = join_rel(rel, name);
                let child = self.folder_child(ctx, &child_rel, local, remote, name, mode).await;
                entry.push(child);
            }
            for name in remote.folder_names() {
                if local_folders.contains(&name) {
                    continue;
                }
                let child_rel = join_rel(rel, &name);
                let child = self.folder_child(ctx, &child_rel, local, remote, &name, mode).await;
                entry.push(child);
            }

            let local_files = local.file_names();
            for name in &local_files {
                let child_rel = join_rel(rel, name);
                let child = self.file_child(ctx, &child_rel, local, remote, name, mode).await;
                entry.push(child);
            }
            for name in remote.file_names() {
                if local_files.contains(&name) {
                    continue;
                }
                let child_rel = join_rel(rel, &name);
                let child = self.file_child(ctx, &child_rel, local, remote, &name, mode).await;
                entry.push(child);
            }
        })
    }

    // ------------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------------

    async fn folder_child(
        &self,
        ctx: &mut SyncContext,
        rel: &str,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let action = match (local.folder(name), remote.folder(name)) {
            (Some(l), Some(r)) => plan_folder_pair(mode, l, r),
            (Some(_), None) => return self.local_only_folder(ctx, rel, local, remote, name, mode).await,
            (None, Some(_)) => return self.remote_only_folder(ctx, rel, local, remote, name, mode).await,
            (None, None) => {
                return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting)
            }
        };
        debug!(folder = %rel, ?action, "Folder pair");

        match action {
            FolderAction::Skip => {
                AuditNode::folder(name, SyncStatus::NotSynced, SyncStatus::NotSynced)
            }
            FolderAction::DropBoth => {
                local.detach_folder(name);
                remote.detach_folder(name);
                AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting)
            }
            FolderAction::DeleteRemote => {
                let Some(counterpart) = remote.folder_mut(name) else {
                    return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
                };
                let (entry, disposition) = deletion::delete_folder::<Remote>(
                    &self.remote_eraser,
                    ctx.delete_physically(),
                    counterpart,
                )
                .await;
                if disposition == Disposition::Detach {
                    remote.detach_folder(name);
                }
                local.detach_folder(name);
                entry
            }
            FolderAction::DeleteLocal => {
                let Some(counterpart) = local.folder_mut(name) else {
                    return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
                };
                let (entry, disposition) = deletion::delete_folder::<Local>(
                    &self.local_eraser,
                    ctx.delete_physically(),
                    counterpart,
                )
                .await;
                if disposition == Disposition::Detach {
                    local.detach_folder(name);
                }
                remote.detach_folder(name);
                entry
            }
            FolderAction::Recreate(Side::Remote) => {
                remote.detach_folder(name);
                self.local_only_folder(ctx, rel, local, remote, name, WalkMode::Push).await
            }
            FolderAction::Recreate(Side::Local) => {
                local.detach_folder(name);
                self.remote_only_folder(ctx, rel, local, remote, name, WalkMode::Pull).await
            }
            FolderAction::Descend(child_mode) => {
                let mut entry =
                    AuditNode::folder(name, SyncStatus::NoChanges, SyncStatus::NoChanges);
                if let (Some(l), Some(r)) = (local.folder_mut(name), remote.folder_mut(name)) {
                    self.walk(ctx, rel, l, r, child_mode, &mut entry).await;
                }
                entry
            }
        }
    }

    /// A local folder without a remote counterpart
    async fn local_only_folder(
        &self,
        ctx: &mut SyncContext,
        rel: &str,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let Some(l) = local.folder(name) else {
            return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        };
        if l.is_tombstoned() {
            local.detach_folder(name);
            return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        }
        if mode == WalkMode::Pull || !l.is_to_sync() {
            return AuditNode::folder(name, SyncStatus::NotSynced, SyncStatus::NotExisting);
        }
        let selection = l.selection();

        let id = match self.remote.create_folder(remote.key(), name).await {
            Ok(id) => id,
            Err(e) => {
                warn!(folder = %rel, error = %e, "Remote folder creation failed");
                return AuditNode::folder(name, SyncStatus::NotSynced, SyncStatus::Error)
                    .with_reason(ReasonCode::TransportError);
            }
        };
        info!(folder = %rel, %id, "Created remote folder");

        let created = remote.attach_folder(RemoteFolder::new(name, id, selection));
        let mut entry = AuditNode::folder(name, SyncStatus::Synced, SyncStatus::Added);
        if let Some(l) = local.folder_mut(name) {
            self.walk(ctx, rel, l, created, WalkMode::Push, &mut entry).await;
        }
        entry
    }

    /// A remote folder without a local counterpart
    async fn remote_only_folder(
        &self,
        ctx: &mut SyncContext,
        rel: &str,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let Some(r) = remote.folder(name) else {
            return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        };
        if r.is_tombstoned() {
            remote.detach_folder(name);
            return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        }
        if mode == WalkMode::Push || !r.is_to_sync() {
            return AuditNode::folder(name, SyncStatus::NotExisting, SyncStatus::NotSynced);
        }
        let selection = r.selection();

        let path = local.key().join(name);
        if let Err(e) = self.local.create_dir(&path).await {
            warn!(folder = %rel, error = %e, "Local folder creation failed");
            return AuditNode::folder(name, SyncStatus::Error, SyncStatus::NotSynced)
                .with_reason(ReasonCode::TransportError);
        }
        info!(folder = %rel, "Created local folder");

        let created = local.attach_folder(LocalFolder::new(name, path, selection));
        let mut entry = AuditNode::folder(name, SyncStatus::Added, SyncStatus::Synced);
        if let Some(r) = remote.folder_mut(name) {
            self.walk(ctx, rel, created, r, WalkMode::Pull, &mut entry).await;
        }
        entry
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    async fn file_child(
        &self,
        ctx: &mut SyncContext,
        rel: &str,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let action = match (local.file(name), remote.file(name)) {
            (Some(l), Some(r)) => plan_file_pair(mode, l, r),
            (Some(_), None) => return self.local_only_file(local, remote, name, mode).await,
            (None, Some(_)) => return self.remote_only_file(local, remote, name, mode).await,
            (None, None) => {
                return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting)
            }
        };
        debug!(file = %rel, ?action, "File pair");

        let folder_id = *remote.key();
        match action {
            FileAction::DropBoth => {
                local.detach_file(name);
                remote.detach_file(name);
                AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting)
            }
            FileAction::DeleteRemote => {
                let Some(counterpart) = remote.file_mut(name) else {
                    return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
                };
                let (entry, disposition) = deletion::delete_file::<Remote>(
                    &self.remote_eraser,
                    ctx.delete_physically(),
                    counterpart,
                )
                .await;
                if disposition == Disposition::Detach {
                    remote.detach_file(name);
                }
                local.detach_file(name);
                entry
            }
            FileAction::DeleteLocal => {
                let Some(counterpart) = local.file_mut(name) else {
                    return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
                };
                let (entry, disposition) = deletion::delete_file::<Local>(
                    &self.local_eraser,
                    ctx.delete_physically(),
                    counterpart,
                )
                .await;
                if disposition == Disposition::Detach {
                    local.detach_file(name);
                }
                remote.detach_file(name);
                entry
            }
            FileAction::Report(l_status, r_status) => AuditNode::file(name, l_status, r_status),
            FileAction::Push | FileAction::Pull | FileAction::Resolve => {
                let (Some(l), Some(r)) = (local.file_mut(name), remote.file_mut(name)) else {
                    return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
                };
                let transfer = self.resolver.transfer();
                match action {
                    FileAction::Push => transfer.push(l, r, &folder_id).await,
                    FileAction::Pull => transfer.pull(l, r).await,
                    _ => {
                        self.resolver
                            .resolve(rel, l, r, &folder_id, ctx.session_mut())
                            .await
                    }
                }
            }
        }
    }

    /// A local file without a remote counterpart
    async fn local_only_file(
        &self,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let Some(l) = local.file_mut(name) else {
            return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        };
        if l.is_deleted() {
            local.detach_file(name);
            return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        }
        if mode == WalkMode::Pull {
            return AuditNode::file(name, SyncStatus::NotSynced, SyncStatus::NotExisting);
        }
        match l.sync_state() {
            FileSyncState::Synced => {
                let (entry, created) = self.resolver.transfer().upload_new(l, remote.key()).await;
                if let Some(created) = created {
                    remote.attach_file(created);
                }
                entry
            }
            other => AuditNode::file(name, other.status(), SyncStatus::NotExisting),
        }
    }

    /// A remote file without a local counterpart
    async fn remote_only_file(
        &self,
        local: &mut LocalFolder,
        remote: &mut RemoteFolder,
        name: &str,
        mode: WalkMode,
    ) -> AuditNode {
        let Some(r) = remote.file_mut(name) else {
            return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        };
        if r.is_deleted() {
            remote.detach_file(name);
            return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotExisting);
        }
        if mode == WalkMode::Push {
            return AuditNode::file(name, SyncStatus::NotExisting, SyncStatus::NotSynced);
        }
        match r.sync_state() {
            FileSyncState::Synced => {
                let dest = local.key().join(name);
                let (entry, created) = self.resolver.transfer().download_new(r, dest).await;
                if let Some(created) = created {
                    local.attach_file(created);
                }
                entry
            }
            other => AuditNode::file(name, SyncStatus::NotExisting, other.status()),
        }
    }
}
