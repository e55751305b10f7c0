//! Newtype wrappers for identifiers
//!
//! Remote nodes are addressed by opaque UUIDs issued by the document
//! service; local nodes are addressed by absolute paths and need no wrapper.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Opaque identifier of a remote folder or document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(Uuid);

impl RemoteId {
    /// Create a new random RemoteId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RemoteId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RemoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidRemoteId(format!("{s}: {e}")))
    }
}

impl From<Uuid> for RemoteId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Validates a node name as it may appear among a folder's children
///
/// Names are compared case-sensitively, so only emptiness and embedded
/// separators are rejected here.
pub fn validate_node_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}
