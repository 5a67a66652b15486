//! JSON checkpoint of a populated tree
//!
//! A crawl writes the root (with every tracker, filled or not) and the list
//! of valid trackers. Resume mode reads both back and rebuilds the graph
//! without touching the network.

use crate::config::OutputConfig;
use crate::storage::traits::{StorageError, StorageResult};
use crate::tree::{RootTrackerNode, TrackerNode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Tree state restored from a checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub root: RootTrackerNode,
    pub trackers: Vec<TrackerNode>,
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    if !path.exists() {
        return Err(StorageError::CheckpointMissing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes `root.json` and `trackers.json` into the output directory
///
/// # Arguments
///
/// * `output` - Output locations from the configuration
/// * `root` - The crawl root with all of its trackers
/// * `trackers` - Trackers whose fill succeeded
pub fn save_checkpoint(
    output: &OutputConfig,
    root: &RootTrackerNode,
    trackers: &[TrackerNode],
) -> StorageResult<()> {
    let root_path = output.root_checkpoint_path();
    let trackers_path = output.trackers_checkpoint_path();
    write_json(&root_path, root)?;
    write_json(&trackers_path, trackers)?;
    tracing::info!(
        root = %root_path.display(),
        trackers = trackers.len(),
        "Checkpoint written"
    );
    Ok(())
}

/// Reads a checkpoint written by [`save_checkpoint`]
///
/// # Returns
///
/// * `Ok(Checkpoint)` - The restored tree
/// * `Err(StorageError::CheckpointMissing)` - A checkpoint file does not exist
pub fn load_checkpoint(output: &OutputConfig) -> StorageResult<Checkpoint> {
    let root = read_json(&output.root_checkpoint_path())?;
    let trackers: Vec<TrackerNode> = read_json(&output.trackers_checkpoint_path())?;
    tracing::info!(trackers = trackers.len(), "Checkpoint loaded");
    Ok(Checkpoint { root, trackers })
}
