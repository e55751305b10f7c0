//! Change detection
//!
//! Classifies nodes by comparing what the latest refresh observed against
//! what was recorded at the last successful sync. Local files compare
//! modification times; remote documents compare version counters.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::status::SyncStatus;
use super::tree::{File, Folder, LocalFileState, RemoteFileState, Replica};

/// Per-file change tracking shared by both replicas
pub trait TrackedState {
    /// True when the file differs from what was last synced, or was never synced
    fn is_changed(&self) -> bool;

    /// True when the latest refresh did not see the file
    fn is_deleted(&self) -> bool;

    /// Records the currently observed state as the last synced state
    fn mark_caught_up(&mut self);
}

impl TrackedState for LocalFileState {
    fn is_changed(&self) -> bool {
        match (self.observed_at, self.last_synced_at) {
            (Some(observed), Some(synced)) => observed > synced,
            _ => true,
        }
    }

    fn is_deleted(&self) -> bool {
        self.observed_at.is_none()
    }

    fn mark_caught_up(&mut self) {
        self.last_synced_at = self.observed_at;
    }
}

impl TrackedState for RemoteFileState {
    fn is_changed(&self) -> bool {
        match (self.version, self.last_synced_version) {
            (Some(version), Some(synced)) => version != synced,
            _ => true,
        }
    }

    fn is_deleted(&self) -> bool {
        self.version.is_none()
    }

    fn mark_caught_up(&mut self) {
        self.last_synced_version = self.version;
    }
}

/// Four-way classification of a file for the reconciliation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSyncState {
    /// Excluded from sync
    NotSynced,
    /// Eligible and unchanged since the last sync
    NoChanges,
    /// Eligible and missing from the latest refresh
    Deleted,
    /// Eligible and changed or never synced
    Synced,
}

impl FileSyncState {
    /// True for the states that require an action (`Deleted`, `Synced`)
    pub fn is_active(self) -> bool {
        matches!(self, FileSyncState::Deleted | FileSyncState::Synced)
    }

    /// The audit status reported when the state is recorded as-is
    pub fn status(self) -> SyncStatus {
        match self {
            FileSyncState::NotSynced => SyncStatus::NotSynced,
            FileSyncState::NoChanges => SyncStatus::NoChanges,
            FileSyncState::Deleted => SyncStatus::Deleted,
            FileSyncState::Synced => SyncStatus::Synced,
        }
    }
}

impl fmt::Display for FileSyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileSyncState::NotSynced => "not_synced",
            FileSyncState::NoChanges => "no_changes",
            FileSyncState::Deleted => "deleted",
            FileSyncState::Synced => "synced",
        };
        write!(f, "{s}")
    }
}

impl<R: Replica> File<R> {
    /// A file is eligible unless it is explicitly excluded
    pub fn is_to_sync(&self) -> bool {
        self.selection().is_to_sync()
    }

    pub fn is_changed(&self) -> bool {
        self.state().is_changed()
    }

    pub fn is_deleted(&self) -> bool {
        self.state().is_deleted()
    }

    /// Composite state: exclusion wins, then unchanged, then deleted
    pub fn sync_state(&self) -> FileSyncState {
        if !self.is_to_sync() {
            FileSyncState::NotSynced
        } else if !self.is_changed() {
            FileSyncState::NoChanges
        } else if self.is_deleted() {
            FileSyncState::Deleted
        } else {
            FileSyncState::Synced
        }
    }
}

impl<R: Replica> Folder<R> {
    /// A folder is eligible unless it is explicitly excluded
    pub fn is_to_sync(&self) -> bool {
        self.selection().is_to_sync()
    }
}
