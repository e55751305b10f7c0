//! docsync Sync - Reconciliation engine
//!
//! Provides:
//! - Refresh of the local and remote trees from their sources
//! - The recursive folder reconciliation walk (bidirectional, push, pull)
//! - The deletion policy applied to counterparts of tombstoned nodes
//! - Sequential runs over all active links, and a periodic scheduler
//!
//! ## Modules
//!
//! - [`refresh`] - Applies directory and folder listings to the trees
//! - [`engine`] - Link-level sync and the reconciliation walk
//! - [`deletion`] - Soft and physical deletion of counterparts
//! - [`runner`] - Runs every active link once and records the run
//! - [`scheduler`] - Interval and daily periodic runs
//! - [`filesystem`] - Local filesystem adapter

pub mod context;
pub mod deletion;
pub mod engine;
pub mod filesystem;
pub mod refresh;
pub mod runner;
pub mod scheduler;

use thiserror::Error;

use docsync_conflict::ConflictError;
use docsync_core::domain::{DomainError, ReasonCode};

pub use context::SyncContext;
pub use engine::{SyncEngine, WalkMode};
pub use filesystem::LocalFileSystemAdapter;
pub use runner::LinkRunner;
pub use scheduler::{Schedule, SyncScheduler};

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// A listing, upload or download call failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A physical delete failed or was refused
    #[error("Physical delete failed: {0}")]
    PhysicalDelete(String),

    /// Both replicas disagree in a way that cannot be settled automatically
    #[error("Ambiguous state: {0}")]
    AmbiguousState(String),

    /// Loading or saving links failed
    #[error("Link store error: {0}")]
    Store(String),

    /// The schedule configuration cannot be used
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Anything else that aborted a whole link
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A domain-level error propagated from docsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// A conflict-layer error propagated from docsync-conflict
    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),
}

impl SyncError {
    /// Reason code recorded on the audit entry of a link that failed with this error
    pub fn reason(&self) -> ReasonCode {
        match self {
            SyncError::Transport(_) | SyncError::IoError(_) => ReasonCode::TransportError,
            SyncError::PhysicalDelete(_) => ReasonCode::PhysicalDeleteFailure,
            SyncError::AmbiguousState(_) => ReasonCode::AmbiguousState,
            SyncError::Conflict(ConflictError::DecisionUnavailable(_))
            | SyncError::Conflict(ConflictError::DecisionFailed(_)) => {
                ReasonCode::DecisionUnavailable
            }
            SyncError::Conflict(ConflictError::TransferFailed(_)) => ReasonCode::TransportError,
            _ => ReasonCode::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(
            SyncError::Transport("listing".into()).reason(),
            ReasonCode::TransportError
        );
        assert_eq!(
            SyncError::PhysicalDelete("x".into()).reason(),
            ReasonCode::PhysicalDeleteFailure
        );
        assert_eq!(
            SyncError::from(ConflictError::DecisionUnavailable("a".into())).reason(),
            ReasonCode::DecisionUnavailable
        );
        assert_eq!(SyncError::Store("db".into()).reason(), ReasonCode::Unexpected);
    }
}
