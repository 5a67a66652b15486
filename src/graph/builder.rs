//! Graph and complexity construction over a populated tree

use crate::graph::sanitize::sanitize_label;
use crate::graph::types::{ComplexityMap, EdgeKind, Graph, NodeKind};
use crate::tree::{IssueNode, RootTrackerNode, TrackerNode};
use regex::Regex;
use std::sync::OnceLock;

/// Group shared by the root node
pub const ROOT_GROUP: &str = "root";

/// Result of one graph pass
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBuild {
    pub graph: Graph,
    pub complexity: ComplexityMap,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[?ISSUE:(\d+)\]?").expect("reference pattern is a valid regex")
    })
}

/// Issue ids mentioned in `text`, one entry per occurrence
pub fn find_references(text: &str) -> Vec<&str> {
    reference_pattern()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|id| id.as_str())
        .collect()
}

fn tracker_group(tracker: &TrackerNode) -> String {
    format!("tracker_{}", tracker.info.tracker_id)
}

/// Pre-order list of every issue under `roots`, following `realChildren`
fn preorder(roots: &[IssueNode]) -> Vec<&IssueNode> {
    let mut ordered = Vec::new();
    let mut stack: Vec<&IssueNode> = roots.iter().rev().collect();
    while let Some(issue) = stack.pop() {
        ordered.push(issue);
        stack.extend(issue.real_children.iter().rev());
    }
    ordered
}

/// Builds the graph and complexity map for a populated tree
///
/// Structural edges run root to tracker, tracker to direct issue and issue to
/// child issue. Every issue is a complexity subject unless `marker` is set, in
/// which case only issues whose `text` equals it are scored. A subject's
/// score is the number of `ISSUE:<id>` mentions in the `text` and `content`
/// of its descendants; each mention that names a node in the graph also adds
/// a reference edge from the subject.
///
/// Each tracker's `graph_node` is set to its index in the returned graph.
///
/// # Arguments
///
/// * `root` - The crawl root
/// * `trackers` - Valid trackers, in root order
/// * `marker` - Optional exact text selecting complexity subjects
pub fn build_graph(
    root: &RootTrackerNode,
    trackers: &mut [TrackerNode],
    marker: Option<&str>,
) -> GraphBuild {
    let mut graph = Graph::new();

    let root_id = sanitize_label(&root.info.id);
    graph.add_node(
        root_id.clone(),
        sanitize_label(&root.info.text),
        NodeKind::Root,
        ROOT_GROUP,
    );

    for tracker in trackers.iter_mut() {
        let tracker_id = sanitize_label(&tracker.info.id);
        let group = tracker_group(tracker);
        let index = graph.add_node(
            tracker_id.clone(),
            sanitize_label(&format!("[{}] {}", tracker.info.id, tracker.info.text)),
            NodeKind::Tracker,
            group.clone(),
        );
        tracker.graph_node = Some(index);
        graph.add_edge(root_id.clone(), tracker_id.clone(), EdgeKind::Structural);

        let mut stack: Vec<(&IssueNode, String)> = tracker
            .children
            .iter()
            .rev()
            .map(|issue| (issue, tracker_id.clone()))
            .collect();
        while let Some((issue, parent_id)) = stack.pop() {
            let issue_id = sanitize_label(&issue.id);
            graph.add_node(
                issue_id.clone(),
                sanitize_label(&format!("[{}] {}", issue.id, issue.title)),
                NodeKind::Issue,
                group.clone(),
            );
            graph.add_edge(parent_id, issue_id.clone(), EdgeKind::Structural);
            for child in issue.real_children.iter().rev() {
                stack.push((child, issue_id.clone()));
            }
        }
    }

    let mut complexity = ComplexityMap::new();
    for tracker in trackers.iter() {
        for subject in preorder(&tracker.children) {
            if marker.is_some_and(|m| subject.text != m) {
                continue;
            }
            let subject_id = sanitize_label(&subject.id);
            let mut score = 0u64;

            for descendant in preorder(&subject.real_children) {
                let sources = [Some(descendant.text.as_str()), descendant.content.as_deref()];
                for text in sources.into_iter().flatten() {
                    for referenced in find_references(text) {
                        score += 1;
                        if graph.contains(referenced) {
                            graph.add_edge(subject_id.clone(), referenced, EdgeKind::Reference);
                        }
                    }
                }
            }

            complexity.insert(subject_id, score);
        }
    }

    tracing::info!(
        nodes = graph.nodes().len(),
        edges = graph.edges().len(),
        subjects = complexity.len(),
        "Graph built"
    );

    GraphBuild { graph, complexity }
}
