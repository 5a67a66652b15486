//! Raw `children` descriptor as delivered by the remote application
//!
//! The same key carries different shapes depending on which endpoint produced
//! the node: tree-config payloads send `true`/`false` for lazily loaded
//! nodes, some listings inline the full child list, and others omit it.

use crate::tree::IssueNode;
use serde::{Deserialize, Serialize};

/// Polymorphic `children` value of an issue placeholder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChildren {
    /// Key absent or `null`
    #[default]
    Unresolved,

    /// Boolean flag: `true` means "at least one child, not yet fetched"
    MarkerOnly(bool),

    /// Child list already inlined by the endpoint
    Resolved(Vec<IssueNode>),
}

impl RawChildren {
    /// Returns the flag value for the boolean case, `None` otherwise
    pub fn marker(&self) -> Option<bool> {
        match self {
            Self::MarkerOnly(flag) => Some(*flag),
            Self::Unresolved | Self::Resolved(_) => None,
        }
    }

    /// Returns true when the key was absent or null
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}
