//! Error types for the conflict engine

use thiserror::Error;

/// Errors that can occur while settling a file pair
#[derive(Debug, Error)]
pub enum ConflictError {
    /// Unknown policy name in configuration
    #[error("invalid conflict policy: {0}")]
    InvalidPolicy(String),

    /// Invalid glob pattern in conflict rule
    #[error("invalid glob pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The policy is `ask` but no decision provider is wired
    #[error("no decision provider available for {0}")]
    DecisionUnavailable(String),

    /// The decision provider returned an error
    #[error("decision provider failed: {0}")]
    DecisionFailed(String),

    /// Upload or download failed
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The file type may not be uploaded
    #[error("forbidden file extension: {0}")]
    ForbiddenExtension(String),
}
