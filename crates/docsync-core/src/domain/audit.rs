//! Audit tree and run records
//!
//! Reconciliation produces an [`AuditNode`] tree that mirrors the folders and
//! files it walked. Each entry carries the outcome on both sides and when it
//! was decided. A link's tree is wrapped in a [`LinkRecord`], and all link
//! records of one invocation form a [`RunRecord`], which is what the audit
//! sink persists.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;
use super::status::{classify, Severity, SyncStatus};

/// Structured reason attached to entries that did not end in agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Listing, upload or download against a source failed
    TransportError,
    /// A physical delete failed and the counterpart was disabled instead
    PhysicalDeleteFailure,
    /// Both replicas of a file are gone
    AmbiguousState,
    /// The file type may not be uploaded
    ForbiddenExtension,
    /// A conflict needed a decision that could not be obtained
    DecisionUnavailable,
    /// The whole link failed outside per-node handling
    Unexpected,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::TransportError => "transport_error",
            ReasonCode::PhysicalDeleteFailure => "physical_delete_failure",
            ReasonCode::AmbiguousState => "ambiguous_state",
            ReasonCode::ForbiddenExtension => "forbidden_extension",
            ReasonCode::DecisionUnavailable => "decision_unavailable",
            ReasonCode::Unexpected => "unexpected",
        };
        write!(f, "{s}")
    }
}

/// What an audit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    File,
}

/// One processed node and its outcome on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNode {
    pub name: String,
    pub kind: NodeKind,
    pub local: SyncStatus,
    pub remote: SyncStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AuditNode>,
}

impl AuditNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, local: SyncStatus, remote: SyncStatus) -> Self {
        Self {
            name: name.into(),
            kind,
            local,
            remote,
            timestamp: Utc::now(),
            reason: None,
            children: Vec::new(),
        }
    }

    pub fn folder(name: impl Into<String>, local: SyncStatus, remote: SyncStatus) -> Self {
        Self::new(name, NodeKind::Folder, local, remote)
    }

    pub fn file(name: impl Into<String>, local: SyncStatus, remote: SyncStatus) -> Self {
        Self::new(name, NodeKind::File, local, remote)
    }

    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Replaces the outcome pair and refreshes the timestamp
    pub fn set_outcome(&mut self, local: SyncStatus, remote: SyncStatus) {
        self.local = local;
        self.remote = remote;
        self.timestamp = Utc::now();
    }

    pub fn push(&mut self, child: AuditNode) {
        self.children.push(child);
    }

    pub fn severity(&self) -> Severity {
        classify(self.local, self.remote)
    }

    /// Number of entries in this subtree, this one included
    pub fn entry_count(&self) -> usize {
        1 + self.children.iter().map(AuditNode::entry_count).sum::<usize>()
    }

    /// Finds a direct child by name and kind
    pub fn child(&self, name: &str, kind: NodeKind) -> Option<&AuditNode> {
        self.children.iter().find(|c| c.name == name && c.kind == kind)
    }

    /// Resolves a `/`-separated path of child names below this entry
    pub fn find(&self, path: &str) -> Option<&AuditNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.children.iter().find(|c| c.name == segment))
    }

    /// Depth-first rows with paths relative to this entry (which gets path "")
    pub fn flatten(&self) -> Vec<AuditRow> {
        let mut rows = Vec::new();
        self.flatten_into("", &mut rows);
        rows
    }

    fn flatten_into(&self, path: &str, rows: &mut Vec<AuditRow>) {
        rows.push(AuditRow {
            path: path.to_string(),
            kind: self.kind,
            local: self.local,
            remote: self.remote,
            timestamp: self.timestamp,
            reason: self.reason,
        });
        for child in &self.children {
            let child_path = if path.is_empty() {
                child.name.clone()
            } else {
                format!("{path}/{}", child.name)
            };
            child.flatten_into(&child_path, rows);
        }
    }

    pub fn summary(&self) -> AuditSummary {
        let mut summary = AuditSummary::default();
        for row in self.flatten() {
            summary.record(classify(row.local, row.remote));
        }
        summary
    }
}

/// A flattened audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub path: String,
    pub kind: NodeKind,
    pub local: SyncStatus,
    pub remote: SyncStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<ReasonCode>,
}

/// Entry counts per severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub counts: BTreeMap<Severity, usize>,
}

impl AuditSummary {
    pub fn record(&mut self, severity: Severity) {
        *self.counts.entry(severity).or_insert(0) += 1;
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    pub fn failures(&self) -> usize {
        self.count(Severity::Failure)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &AuditSummary) {
        for (severity, count) in &other.counts {
            *self.counts.entry(*severity).or_insert(0) += count;
        }
    }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(severity, count)| format!("{severity}={count}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Outcome of one link within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub link: String,
    pub local_root: PathBuf,
    pub remote_root: RemoteId,
    pub timestamp: DateTime<Utc>,
    pub root: AuditNode,
}

impl LinkRecord {
    /// A link that failed as a whole and yields a single `Error/Error` entry
    pub fn failed(link: impl Into<String>, local_root: PathBuf, remote_root: RemoteId) -> Self {
        let link = link.into();
        let root = AuditNode::folder(link.clone(), SyncStatus::Error, SyncStatus::Error)
            .with_reason(ReasonCode::Unexpected);
        Self {
            link,
            local_root,
            remote_root,
            timestamp: Utc::now(),
            root,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.root.local.is_error() && self.root.remote.is_error()
    }

    pub fn summary(&self) -> AuditSummary {
        self.root.summary()
    }
}

/// All link records produced by one sync invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub links: Vec<LinkRecord>,
}

impl RunRecord {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            links: Vec::new(),
        }
    }

    pub fn push(&mut self, record: LinkRecord) {
        self.links.push(record);
    }

    pub fn link(&self, name: &str) -> Option<&LinkRecord> {
        self.links.iter().find(|r| r.link == name)
    }

    pub fn summary(&self) -> AuditSummary {
        let mut summary = AuditSummary::default();
        for link in &self.links {
            summary.merge(&link.summary());
        }
        summary
    }
}

impl Default for RunRecord {
    fn default() -> Self {
        Self::new()
    }
}
