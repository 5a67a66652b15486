//! Node definitions for the tracker hierarchy

use crate::tree::de::{lenient_list, lenient_string, tracker_number};
use crate::tree::RawChildren;
use serde::{Deserialize, Serialize};

/// Fields shared by the root tracker and its child trackers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    /// Stable per-session node identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    /// Numeric tracker identifier used by the remote application
    #[serde(
        rename = "trackerId",
        alias = "trakerId",
        default,
        deserialize_with = "tracker_number"
    )]
    pub tracker_id: i64,

    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    /// Display text, matched exactly when resolving the root by name
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub icon: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
}

impl Tracker {
    /// Returns true when `id` names this tracker, either by node id or by
    /// numeric tracker id
    pub fn matches_id(&self, id: &str) -> bool {
        let id = id.trim();
        self.id == id || (self.tracker_id > 0 && self.tracker_id.to_string() == id)
    }

    /// Identifier sent to the tree endpoint as `tracker_id`
    ///
    /// Listings do not always carry the numeric id, in which case the node id
    /// doubles as the tracker id.
    pub fn request_id(&self) -> String {
        if self.tracker_id > 0 {
            self.tracker_id.to_string()
        } else {
            self.id.clone()
        }
    }
}

/// The single top-level tracker a crawl session starts from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootTrackerNode {
    #[serde(flatten)]
    pub info: Tracker,

    /// Child trackers in listing order
    #[serde(default, deserialize_with = "lenient_list")]
    pub children: Vec<TrackerNode>,
}

/// A tracker bucket owning its direct issues
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerNode {
    #[serde(flatten)]
    pub info: Tracker,

    /// Direct issues, populated by the tracker fill
    #[serde(default, deserialize_with = "lenient_list")]
    pub children: Vec<IssueNode>,

    /// Index of this tracker's node in the most recent graph build
    #[serde(skip)]
    pub graph_node: Option<usize>,
}

impl TrackerNode {
    /// Runs the has-children derivation on every direct issue
    pub fn assert_children(&mut self) {
        for issue in &mut self.children {
            issue.assert_children();
        }
    }
}

// The graph back-reference is rebuilt on every pass and never part of identity.
impl PartialEq for TrackerNode {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info && self.children == other.children
    }
}

/// A single requirement item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    /// Raw tree text; cross-reference markers are scanned here
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,

    /// Detail-page markup, filled by the content pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub icon: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,

    #[serde(default, skip_serializing_if = "RawChildren::is_unresolved")]
    pub children: RawChildren,

    /// Derived from `children`; see [`IssueNode::assert_children`]
    #[serde(default)]
    pub has_children: bool,

    /// Children fetched by the recursive fill, never inferred
    #[serde(default)]
    pub real_children: Vec<IssueNode>,
}

impl IssueNode {
    /// Recomputes `has_children` from the raw descriptor
    ///
    /// Only the boolean form carries information; an absent descriptor or an
    /// inlined list leaves the current value untouched.
    pub fn assert_children(&mut self) {
        if let Some(flag) = self.children.marker() {
            self.has_children = flag;
        }
    }

    /// Returns true once the recursive fill has stored at least one child
    pub fn is_children_resolved(&self) -> bool {
        !self.real_children.is_empty()
    }
}
