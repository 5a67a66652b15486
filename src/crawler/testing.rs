//! Scripted page executor for unit tests

use crate::config::{parse_config, Config, SiteConfig};
use crate::executor::{ExecError, ExecResult, FetchOptions, PageExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const TEST_CONFIG: &str = r##"
[site]
host = "https://cb.test"
project-id = "119"
root-tracker-name = "Software Requirements"
tracker-home-tree-url = "/cb/ajax/getTrackerHomePageTree.spr?proj_id={project}"
tracker-page-url = "/cb/tracker/{id}"
tree-ajax-url = "/cb/trackers/ajax/tree.spr"
issue-page-url = "/cb/issue/{id}"

[page]
issue-content-selector = "#issue-body"
wait-timeout = 5
poll-interval = 10

[crawler]
throttle-delay = 0

[output]
directory = "out"
database-path = "atlas.db"
summary-path = "summary.md"
"##;

pub(crate) fn test_config() -> Config {
    match parse_config(TEST_CONFIG) {
        Ok(config) => config,
        Err(e) => panic!("test config must be valid: {e}"),
    }
}

#[derive(Debug, Default)]
struct FakeLog {
    current: Option<String>,
    navigations: Vec<String>,
    fetches: Vec<(String, FetchOptions)>,
}

/// Serves a fixed tracker site from memory
///
/// Unknown pages fail immediately instead of waiting out their timeout.
pub(crate) struct FakeExecutor {
    site: SiteConfig,
    tree_expression: String,
    listing: Option<String>,
    tracker_trees: HashMap<String, Value>,
    issue_children: HashMap<String, String>,
    issue_content: HashMap<String, String>,
    globals: HashMap<String, Value>,
    log: Mutex<FakeLog>,
}

impl FakeExecutor {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            site: config.site.clone(),
            tree_expression: config.page.tree_config_expression.clone(),
            listing: None,
            tracker_trees: HashMap::new(),
            issue_children: HashMap::new(),
            issue_content: HashMap::new(),
            globals: HashMap::new(),
            log: Mutex::new(FakeLog::default()),
        }
    }

    pub(crate) fn with_listing(mut self, listing: Value) -> Self {
        self.listing = Some(listing.to_string());
        self
    }

    pub(crate) fn with_tracker_tree(mut self, tracker_id: &str, tree: Value) -> Self {
        self.tracker_trees.insert(tracker_id.to_string(), tree);
        self
    }

    pub(crate) fn with_children(mut self, issue_id: &str, children: Value) -> Self {
        self.issue_children
            .insert(issue_id.to_string(), children.to_string());
        self
    }

    pub(crate) fn with_raw_children(mut self, issue_id: &str, body: &str) -> Self {
        self.issue_children
            .insert(issue_id.to_string(), body.to_string());
        self
    }

    pub(crate) fn with_content(mut self, issue_id: &str, html: &str) -> Self {
        self.issue_content
            .insert(issue_id.to_string(), html.to_string());
        self
    }

    pub(crate) fn with_global(mut self, expression: &str, value: Value) -> Self {
        self.globals.insert(expression.to_string(), value);
        self
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub(crate) fn fetch_headers(&self) -> Vec<Vec<(String, String)>> {
        self.lock()
            .fetches
            .iter()
            .map(|(_, options)| options.headers.clone())
            .collect()
    }

    pub(crate) fn fetch_bodies(&self) -> Vec<String> {
        self.lock()
            .fetches
            .iter()
            .map(|(_, options)| options.encoded_body())
            .collect()
    }

    /// `nodeId` of every tree request, in order
    pub(crate) fn fetched_node_ids(&self) -> Vec<String> {
        self.lock()
            .fetches
            .iter()
            .filter_map(|(_, options)| options.body.as_ref())
            .filter_map(|body| body.get("nodeId").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn current(&self) -> ExecResult<String> {
        self.lock().current.clone().ok_or(ExecError::NoPage)
    }

    fn tracker_tree_on(&self, url: &str) -> Option<&Value> {
        self.tracker_trees
            .iter()
            .find(|(id, _)| self.site.tracker_page_url(id) == url)
            .map(|(_, tree)| tree)
    }

    fn content_on(&self, url: &str) -> Option<&String> {
        self.issue_content
            .iter()
            .find(|(id, _)| self.site.issue_page_url(id) == url)
            .map(|(_, html)| html)
    }

    fn global(&self, name: &str) -> ExecResult<Value> {
        let url = self.current()?;
        if name == self.tree_expression {
            if let Some(tree) = self.tracker_tree_on(&url) {
                return Ok(tree.clone());
            }
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| ExecError::Evaluation {
                expression: name.to_string(),
                message: "undefined".to_string(),
            })
    }
}

#[async_trait]
impl PageExecutor for FakeExecutor {
    async fn navigate(&self, url: &str) -> ExecResult<()> {
        let mut log = self.lock();
        log.navigations.push(url.to_string());
        log.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_global_defined(
        &self,
        name: &str,
        timeout: Duration,
        _poll_interval: Duration,
    ) -> ExecResult<()> {
        self.global(name).map(|_| ()).map_err(|_| ExecError::Timeout {
            what: format!("global '{}'", name),
            after: timeout,
        })
    }

    async fn evaluate(&self, expression: &str) -> ExecResult<Value> {
        self.global(expression)
    }

    async fn fetch_in_page(&self, url: &str, options: &FetchOptions) -> ExecResult<String> {
        self.lock()
            .fetches
            .push((url.to_string(), options.clone()));

        let not_found = || ExecError::Fetch {
            url: url.to_string(),
            message: "HTTP 404".to_string(),
        };

        if url == self.site.tracker_home_tree_url() {
            return self.listing.clone().ok_or_else(not_found);
        }
        if url == self.site.tree_ajax_url() {
            let node_id = options
                .body
                .as_ref()
                .and_then(|body| body.get("nodeId"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            return self.issue_children.get(node_id).cloned().ok_or_else(not_found);
        }
        Err(not_found())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> ExecResult<()> {
        let url = self.current()?;
        match self.content_on(&url) {
            Some(_) => Ok(()),
            None => Err(ExecError::Timeout {
                what: format!("selector '{}'", selector),
                after: timeout,
            }),
        }
    }

    async fn inner_html(&self, _selector: &str) -> ExecResult<Vec<String>> {
        let url = self.current()?;
        Ok(self.content_on(&url).cloned().into_iter().collect())
    }
}
