//! Tracker-Atlas: a structure mapper for requirement trackers
//!
//! This crate crawls a Codebeamer-style tracker application through a page
//! session, reconstructs its root/tracker/issue hierarchy locally, and derives
//! a cross-reference graph and a per-item complexity metric from the result.

pub mod config;
pub mod crawler;
pub mod executor;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod tree;

use thiserror::Error;

/// Main error type for tracker-atlas operations
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Root tracker '{name}' not found in the project listing")]
    RootNotFound { name: String },

    #[error("Page session error: {0}")]
    Network(#[from] executor::ExecError),

    #[error("Failed to decode {what}: {source}")]
    Parse {
        what: String,
        source: serde_json::Error,
    },

    #[error("CSRF token expression '{expression}' evaluated to an empty token")]
    EmptyCsrfToken { expression: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

impl AtlasError {
    /// Wraps a decode failure with a description of what was being decoded
    pub fn parse(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            what: what.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for tracker-atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlFailure, CrawlOutcome, FailureStage, TreeCrawler};
pub use executor::{HttpPageExecutor, PageExecutor};
pub use graph::{build_graph, ComplexityMap, Graph};
pub use pipeline::{spawn_pipeline, Pipeline, PipelineMode, PipelineOutput};
pub use progress::{Phase, ProgressEvent, ProgressSink};
pub use tree::{IssueNode, RootTrackerNode, TrackerNode};
