//! Graph & complexity builder
//!
//! Runs once over a fully populated tree, whether freshly crawled or restored
//! from a checkpoint, and produces:
//!
//! - a directed graph with one node per root, tracker and issue id, linked by
//!   structural edges and by cross-reference edges found in issue text
//! - a complexity map counting the cross-references below each subject issue

mod builder;
mod sanitize;
mod types;

pub use builder::{build_graph, find_references, GraphBuild, ROOT_GROUP};
pub use sanitize::sanitize_label;
pub use types::{ComplexityMap, EdgeKind, Graph, GraphEdge, GraphNode, NodeKind};
