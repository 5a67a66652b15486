//! Crawler module for reconstructing the tracker hierarchy
//!
//! This module contains the core crawling logic, including:
//! - Root resolution and tracker fills through a page session
//! - Recursive issue expansion against the shared tree endpoint
//! - Detail-page content loading
//! - Fixed request pacing and failure bookkeeping
//! - Overall crawl coordination with weighted progress

mod coordinator;
mod engine;
mod failure;
mod request;
mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use engine::{decode_tree_config, ProgressCallback, TreeCrawler};
pub use failure::{CrawlFailure, FailureStage};
pub use request::tree_request;
pub use throttle::Throttle;
