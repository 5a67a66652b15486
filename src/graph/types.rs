//! Graph node and edge types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Complexity per subject issue, keyed by sanitized id
pub type ComplexityMap = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Tracker,
    Issue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Parent/child relation in the tracker hierarchy
    Structural,

    /// `ISSUE:<id>` mention found under a complexity subject
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,

    /// Clustering key: `root`, or `tracker_<trackerId>` for a tracker and
    /// every issue below it
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Directed graph with deduplicated nodes and edges
///
/// Nodes and edges keep insertion order, so the same tree always serializes
/// to the same document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    edge_keys: HashSet<GraphEdge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node and returns its index
    ///
    /// When the id is already present the existing node is kept and its
    /// index returned.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        kind: NodeKind,
        group: impl Into<String>,
    ) -> usize {
        let id = id.into();
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let position = self.nodes.len();
        self.index.insert(id.clone(), position);
        self.nodes.push(GraphNode {
            id,
            label: label.into(),
            kind,
            group: group.into(),
        });
        position
    }

    /// Records an edge once per `(from, to, kind)`
    ///
    /// # Returns
    ///
    /// `true` when the edge was new
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, kind: EdgeKind) -> bool {
        let edge = GraphEdge {
            from: from.into(),
            to: to.into(),
            kind,
        };
        if !self.edge_keys.insert(edge.clone()) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }
}

// Lookup tables are derived from the node and edge lists.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}
