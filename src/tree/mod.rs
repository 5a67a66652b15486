//! Tree model for the reconstructed tracker hierarchy
//!
//! This module holds the three node kinds the crawl populates:
//!
//! - `RootTrackerNode`: the single top-level tracker selected by name
//! - `TrackerNode`: a tracker bucket owning its direct issues
//! - `IssueNode`: a requirement item, possibly with lazily fetched children
//!
//! Field names on the wire and in checkpoint files follow the remote
//! application's JSON (`trackerId`, `hasChildren`, `realChildren`, ...).

mod children;
mod de;
mod node;

pub use children::RawChildren;
pub use node::{IssueNode, RootTrackerNode, Tracker, TrackerNode};

/// Counts every issue under the given roots, including all resolved
/// `realChildren` transitively.
pub fn count_issues(issues: &[IssueNode]) -> usize {
    issues
        .iter()
        .map(|issue| 1 + count_issues(&issue.real_children))
        .sum()
}

/// Follows an index path through `realChildren`, starting at `node`.
///
/// An empty path returns `node` itself. Paths are built by the crawler from
/// indices it has just observed, so they always resolve.
pub(crate) fn descend_mut<'a>(mut node: &'a mut IssueNode, path: &[usize]) -> &'a mut IssueNode {
    for &index in path {
        node = &mut node.real_children[index];
    }
    node
}
