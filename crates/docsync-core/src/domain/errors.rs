//! Domain error types
//!
//! Errors raised by pure domain operations: name validation, tree lookups,
//! selection edits and link validation.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Node names must be non-empty and must not contain a path separator
    #[error("Invalid node name: {0}")]
    InvalidName(String),

    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// No node exists at the given tree path
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A selection value that cannot be applied to the target node
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
