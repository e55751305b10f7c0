//! File conflict resolver
//!
//! Settles one matched `(local, remote)` file pair. The outcome depends on
//! the composite state of each side:
//!
//! | Local     | Remote    | Outcome                                  |
//! |-----------|-----------|------------------------------------------|
//! | deleted   | deleted   | `Error/Error`, ambiguous                 |
//! | any       | deleted   | local state as-is, remote `NotExisting`  |
//! | deleted   | any       | local `NotExisting`, remote state as-is  |
//! | passive   | passive   | both states as-is                        |
//! | `Synced`  | passive   | push                                     |
//! | passive   | `Synced`  | pull                                     |
//! | `Synced`  | `Synced`  | conflict, settled by the session         |
//!
//! "Passive" is `NotSynced` or `NoChanges`. Deletion checks use the raw
//! tracking state, so they apply to excluded files too.

use tracing::{debug, info, warn};

use docsync_core::domain::{
    AuditNode, FileSyncState, LocalFile, ReasonCode, RemoteFile, RemoteId, SyncStatus,
    TrackedState,
};
use docsync_core::ports::ConflictChoice;

use crate::session::ConflictSession;
use crate::transfer::FileTransfer;

pub struct FileConflictResolver {
    transfer: FileTransfer,
}

impl FileConflictResolver {
    pub fn new(transfer: FileTransfer) -> Self {
        Self { transfer }
    }

    pub fn transfer(&self) -> &FileTransfer {
        &self.transfer
    }

    /// Settles a matched file pair
    ///
    /// `path` is relative to the link root and selects the conflict policy.
    /// `folder` is the id of the remote folder holding the document.
    pub async fn resolve(
        &self,
        path: &str,
        local: &mut LocalFile,
        remote: &mut RemoteFile,
        folder: &RemoteId,
        session: &mut ConflictSession,
    ) -> AuditNode {
        let name = local.name().to_string();

        match (local.is_deleted(), remote.is_deleted()) {
            (true, true) => {
                warn!(path, "Both replicas of file are gone");
                return AuditNode::file(name, SyncStatus::Error, SyncStatus::Error)
                    .with_reason(ReasonCode::AmbiguousState);
            }
            (false, true) => {
                return AuditNode::file(name, local.sync_state().status(), SyncStatus::NotExisting);
            }
            (true, false) => {
                return AuditNode::file(name, SyncStatus::NotExisting, remote.sync_state().status());
            }
            (false, false) => {}
        }

        let l_state = local.sync_state();
        let r_state = remote.sync_state();
        debug!(path, local = %l_state, remote = %r_state, "Resolving file pair");

        match (l_state == FileSyncState::Synced, r_state == FileSyncState::Synced) {
            (false, false) => AuditNode::file(name, l_state.status(), r_state.status()),
            (true, false) => self.transfer.push(local, remote, folder).await,
            (false, true) => self.transfer.pull(local, remote).await,
            (true, true) => self.settle_conflict(path, local, remote, folder, session).await,
        }
    }

    async fn settle_conflict(
        &self,
        path: &str,
        local: &mut LocalFile,
        remote: &mut RemoteFile,
        folder: &RemoteId,
        session: &mut ConflictSession,
    ) -> AuditNode {
        let choice = match session.decide(path, local, remote).await {
            Ok(choice) => choice,
            Err(e) => {
                warn!(path, error = %e, "Conflict left undecided");
                return AuditNode::file(local.name(), SyncStatus::Error, SyncStatus::Error)
                    .with_reason(ReasonCode::DecisionUnavailable);
            }
        };

        info!(path, %choice, "Settling conflict");
        match choice {
            ConflictChoice::PreferLocal => self.transfer.push(local, remote, folder).await,
            ConflictChoice::PreferRemote => self.transfer.pull(local, remote).await,
            ConflictChoice::Neither => {
                local.state_mut().mark_caught_up();
                remote.state_mut().mark_caught_up();
                AuditNode::file(local.name(), SyncStatus::NotSynced, SyncStatus::NotSynced)
            }
        }
    }
}
