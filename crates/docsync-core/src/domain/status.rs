//! Outcome statuses recorded per side of every processed node

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of processing one node on one side of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// A transfer, refresh or delete on this side failed
    Error,
    /// Excluded from sync
    NotSynced,
    /// Eligible and nothing to do
    NoChanges,
    /// Created on this side during the run
    Added,
    /// Physically deleted on this side
    Deleted,
    /// No node exists on this side
    NotExisting,
    /// Disabled from future sync instead of being deleted
    Removed,
    /// Content on this side is in agreement with the other side
    Synced,
}

impl SyncStatus {
    pub fn is_error(self) -> bool {
        self == SyncStatus::Error
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Error => "error",
            SyncStatus::NotSynced => "not_synced",
            SyncStatus::NoChanges => "no_changes",
            SyncStatus::Added => "added",
            SyncStatus::Deleted => "deleted",
            SyncStatus::NotExisting => "not_existing",
            SyncStatus::Removed => "removed",
            SyncStatus::Synced => "synced",
        };
        write!(f, "{s}")
    }
}

/// How noteworthy a `(local, remote)` status pair is, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Something failed, or content exists on one side only after the run
    Failure,
    /// A node was deleted or disabled
    Deletion,
    /// A node was created
    Addition,
    /// Content moved from one side to the other
    Update,
    /// Eligible and already in agreement
    Unchanged,
    /// Excluded or absent on both sides
    Skipped,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Failure => "failure",
            Severity::Deletion => "deletion",
            Severity::Addition => "addition",
            Severity::Update => "update",
            Severity::Unchanged => "unchanged",
            Severity::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Ranks a status pair
///
/// A side that reports content (`Added`, `Synced`) while the
/// other side reports `NotExisting` is a failure: the run left the two
/// trees disagreeing about that node.
pub fn classify(local: SyncStatus, remote: SyncStatus) -> Severity {
    use SyncStatus::*;

    let either = |f: fn(SyncStatus) -> bool| f(local) || f(remote);
    let has_content = |s: SyncStatus| matches!(s, Added | Synced);

    if either(|s| s == Error) {
        return Severity::Failure;
    }
    if either(|s| matches!(s, Deleted | Removed)) {
        return Severity::Deletion;
    }
    if (local == NotExisting && has_content(remote)) || (remote == NotExisting && has_content(local)) {
        return Severity::Failure;
    }
    if either(|s| s == Added) {
        return Severity::Addition;
    }
    if either(|s| s == Synced) {
        return Severity::Update;
    }
    if either(|s| s == NoChanges) {
        return Severity::Unchanged;
    }
    Severity::Skipped
}
