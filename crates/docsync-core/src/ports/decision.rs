//! Conflict decision provider port (driving side of the conflict prompt)
//!
//! When both replicas of a file changed and the policy is `ask`, the engine
//! awaits a decision from this provider before continuing with the next
//! node. Production wiring forwards the request to an interactive prompt;
//! tests supply canned decisions.
//!
//! ## Design Notes
//!
//! - The provider must not call back into the engine or the link store: the
//!   link's trees are exclusively borrowed by the reconciliation pass while
//!   the request is pending.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::tree::{LocalFile, RemoteFile};

/// How a two-sided edit is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Upload the local content over the remote document
    PreferLocal,
    /// Download the remote document over the local file
    PreferRemote,
    /// Transfer nothing and accept both sides as they are
    Neither,
}

impl fmt::Display for ConflictChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictChoice::PreferLocal => "prefer_local",
            ConflictChoice::PreferRemote => "prefer_remote",
            ConflictChoice::Neither => "neither",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConflictChoice {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prefer_local" | "local" => Ok(ConflictChoice::PreferLocal),
            "prefer_remote" | "remote" => Ok(ConflictChoice::PreferRemote),
            "neither" | "none" => Ok(ConflictChoice::Neither),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown conflict choice '{other}'"
            ))),
        }
    }
}

/// An operator's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDecision {
    pub choice: ConflictChoice,
    /// Apply the same choice to every further conflict of the current link run
    pub remember: bool,
}

impl ConflictDecision {
    pub fn once(choice: ConflictChoice) -> Self {
        Self {
            choice,
            remember: false,
        }
    }

    pub fn remembered(choice: ConflictChoice) -> Self {
        Self {
            choice,
            remember: true,
        }
    }
}

/// Port trait for settling two-sided edits interactively
#[async_trait]
pub trait IConflictDecisionProvider: Send + Sync {
    /// Asks how to settle the conflict on the file at `path` (relative to the link root)
    async fn ask(
        &self,
        path: &str,
        local: &LocalFile,
        remote: &RemoteFile,
    ) -> anyhow::Result<ConflictDecision>;
}
