//! Request payloads for the tracker application's AJAX endpoints

use serde_json::{json, Map, Value};

/// View id the tree endpoint expects for the outline view
const OUTLINE_VIEW_ID: i64 = -11;

/// Builds the form payload asking the tree endpoint for a node's children
///
/// The remote expects the tracker id under both `tracker_id` and `trackerId`.
///
/// # Arguments
///
/// * `project_id` - Project the tracker belongs to
/// * `tracker_id` - Tracker owning the node
/// * `node_id` - Issue whose children are requested
/// * `open_nodes` - Comma-separated list of expanded nodes, usually empty
pub fn tree_request(project_id: &str, tracker_id: &str, node_id: &str, open_nodes: &str) -> Map<String, Value> {
    let payload = json!({
        "project_id": project_id,
        "type": "",
        "tracker_id": tracker_id,
        "trackerId": tracker_id,
        "revision": "",
        "view_id": OUTLINE_VIEW_ID,
        "useOutlineCache": true,
        "nodeId": node_id,
        "ratingFilters": [],
        "dateFilters": [],
        "suspectedFilters": [],
        "statusFilters": [],
        "cbQL": format!("project.id IN ({}) AND tracker.id IN ({})", project_id, tracker_id),
        "baselineModeBaselineId": "",
        "showAncestorItems": true,
        "showDescendantItems": false,
        "openNodes": open_nodes,
    });

    match payload {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
