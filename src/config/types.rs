use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder substituted with the project id
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Placeholder substituted with a tracker or issue id
pub const ID_PLACEHOLDER: &str = "{id}";

/// Main configuration structure for tracker-atlas
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub page: PageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub complexity: ComplexityConfig,
    pub output: OutputConfig,
}

/// Remote application addressing
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the tracker application, e.g. `https://cb.example.com`
    pub host: String,

    /// Project whose trackers are crawled
    #[serde(rename = "project-id")]
    pub project_id: String,

    /// Display text of the root tracker, matched exactly
    #[serde(rename = "root-tracker-name")]
    pub root_tracker_name: String,

    /// Listing endpoint; `{project}` is replaced with the project id
    #[serde(rename = "tracker-home-tree-url")]
    pub tracker_home_tree_url: String,

    /// Tracker page; `{id}` is replaced with the tracker node id
    #[serde(rename = "tracker-page-url")]
    pub tracker_page_url: String,

    /// Shared tree endpoint used to expand issue children
    #[serde(rename = "tree-ajax-url")]
    pub tree_ajax_url: String,

    /// Issue detail page; `{id}` is replaced with the issue id
    #[serde(rename = "issue-page-url")]
    pub issue_page_url: String,

    /// Only root children with this icon are crawled, when set
    #[serde(rename = "tracker-icon", default)]
    pub tracker_icon: Option<String>,
}

impl SiteConfig {
    /// Absolute URL of the tracker listing endpoint
    pub fn tracker_home_tree_url(&self) -> String {
        self.absolute(
            &self
                .tracker_home_tree_url
                .replace(PROJECT_PLACEHOLDER, &self.project_id),
        )
    }

    /// Absolute URL of a tracker page
    pub fn tracker_page_url(&self, tracker_id: &str) -> String {
        self.absolute(&self.tracker_page_url.replace(ID_PLACEHOLDER, tracker_id))
    }

    /// Absolute URL of the tree endpoint
    pub fn tree_ajax_url(&self) -> String {
        self.absolute(&self.tree_ajax_url)
    }

    /// Absolute URL of an issue detail page
    pub fn issue_page_url(&self, issue_id: &str) -> String {
        self.absolute(&self.issue_page_url.replace(ID_PLACEHOLDER, issue_id))
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.host.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// In-page lookups
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    /// Page-global holding a tracker's issue tree
    #[serde(rename = "tree-config-expression", default = "default_tree_config_expression")]
    pub tree_config_expression: String,

    /// CSS selector of the issue body on the detail page
    #[serde(rename = "issue-content-selector")]
    pub issue_content_selector: String,

    /// Bound on every page wait (seconds)
    #[serde(rename = "wait-timeout", default = "default_wait_timeout")]
    pub wait_timeout: u64,

    /// Interval between page-global checks (milliseconds)
    #[serde(rename = "poll-interval", default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl PageConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

fn default_tree_config_expression() -> String {
    "tree.config.data".to_string()
}

fn default_wait_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    100
}

/// Authentication settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Attach the CSRF header pair to every in-page fetch
    #[serde(default)]
    pub csrf: bool,

    /// Page-global holding the CSRF token
    #[serde(rename = "csrf-token-expression", default)]
    pub csrf_token_expression: String,

    /// Raw `Cookie` header of an authenticated session
    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// Crawl pacing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Fixed delay before every round trip after the first (milliseconds)
    #[serde(rename = "throttle-delay", default = "default_throttle_delay")]
    pub throttle_delay: u64,

    /// Restricts the crawl to one tracker, matched by node id or numeric
    /// tracker id
    #[serde(rename = "only-tracker", default)]
    pub only_tracker: Option<String>,
}

impl CrawlerConfig {
    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            throttle_delay: default_throttle_delay(),
            only_tracker: None,
        }
    }
}

fn default_throttle_delay() -> u64 {
    500
}

/// Complexity subject selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplexityConfig {
    /// Only issues whose text equals this marker are scored, when set
    #[serde(default)]
    pub marker: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the checkpoint, graph and complexity JSON files
    pub directory: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

impl OutputConfig {
    pub fn root_checkpoint_path(&self) -> PathBuf {
        Path::new(&self.directory).join("root.json")
    }

    pub fn trackers_checkpoint_path(&self) -> PathBuf {
        Path::new(&self.directory).join("trackers.json")
    }

    pub fn complexity_path(&self) -> PathBuf {
        Path::new(&self.directory).join("complexity.json")
    }

    pub fn graph_path(&self) -> PathBuf {
        Path::new(&self.directory).join("graph.json")
    }
}
