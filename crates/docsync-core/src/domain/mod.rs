//! Domain entities and business logic
//!
//! - Tree node model for the local and remote replicas
//! - Change detection and per-file sync state
//! - Tri-state selection and its reconciler
//! - Outcome statuses and their severity ranking
//! - Audit tree and run records
//! - Link entity
//! - Domain-specific error types

pub mod audit;
pub mod change;
pub mod errors;
pub mod link;
pub mod newtypes;
pub mod selection;
pub mod status;
pub mod tree;

// Re-export commonly used types
pub use audit::{AuditNode, AuditRow, AuditSummary, LinkRecord, NodeKind, ReasonCode, RunRecord};
pub use change::{FileSyncState, TrackedState};
pub use errors::DomainError;
pub use link::{Link, ProjectRef, SyncDirection};
pub use newtypes::*;
pub use selection::{
    apply_selection, reconcile_selection, Selection, SelectionAnomaly, SelectionReport,
};
pub use status::{classify, Severity, SyncStatus};
pub use tree::{
    File, Folder, Local, LocalFile, LocalFileState, LocalFolder, LocalNode, Node, NodeRefMut,
    Remote, RemoteFile, RemoteFileState, RemoteFolder, RemoteNode, Replica, Side,
};
