//! docsync Conflict - File-level conflict resolution
//!
//! Provides:
//! - `PolicyEngine`: default policy plus glob-matched overrides
//! - `ConflictSession`: per-link decision state, including a remembered choice
//! - `FileTransfer`: push and pull of one file against the remote source
//! - `FileConflictResolver`: the decision table for a matched file pair

pub mod error;
pub mod policy;
pub mod resolver;
pub mod session;
pub mod transfer;

pub use error::ConflictError;
pub use policy::{ConflictPolicy, ConflictRule, PolicyEngine};
pub use resolver::FileConflictResolver;
pub use session::ConflictSession;
pub use transfer::FileTransfer;
