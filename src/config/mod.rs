//! Configuration module for tracker-atlas
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tracker_atlas::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("atlas.toml")).unwrap();
//! println!("Crawling project {}", config.site.project_id);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ComplexityConfig, Config, CrawlerConfig, OutputConfig, PageConfig, SessionConfig, SiteConfig,
    ID_PLACEHOLDER, PROJECT_PLACEHOLDER,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
