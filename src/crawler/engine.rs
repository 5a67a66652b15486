//! Tree crawl operations
//!
//! Every operation here drives the page executor for one node and writes the
//! result into that node in place. Node-scoped failures are logged, recorded
//! in the failure list and absorbed; only root resolution is fatal.

use crate::config::Config;
use crate::crawler::request::tree_request;
use crate::crawler::throttle::Throttle;
use crate::crawler::{CrawlFailure, FailureStage};
use crate::executor::{evaluate_into, ExecError, FetchOptions, PageExecutor, Session};
use crate::tree::{count_issues, descend_mut, IssueNode, RootTrackerNode, TrackerNode};
use crate::{AtlasError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Progress callback: receives an increment and the node it was earned on
pub type ProgressCallback<'f> = dyn FnMut(f64, &IssueNode) + Send + 'f;

/// Shape of the tree-config page-global on a tracker page
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TreeConfigData {
    Tree {
        #[serde(default)]
        children: Option<Vec<IssueNode>>,
    },
    Flat(Vec<IssueNode>),
}

impl TreeConfigData {
    fn into_children(self) -> Vec<IssueNode> {
        match self {
            Self::Tree { children } => children.unwrap_or_default(),
            Self::Flat(children) => children,
        }
    }
}

/// Drives one page session through the tracker hierarchy
pub struct TreeCrawler<'a, E: PageExecutor + ?Sized> {
    executor: &'a E,
    config: &'a Config,
    session: Session,
    throttle: Throttle,
    failures: Vec<CrawlFailure>,
}

impl<'a, E: PageExecutor + ?Sized> TreeCrawler<'a, E> {
    pub fn new(executor: &'a E, config: &'a Config) -> Self {
        Self {
            executor,
            config,
            session: Session::default(),
            throttle: Throttle::new(config.crawler.throttle_delay()),
            failures: Vec::new(),
        }
    }

    /// Session state attached to every in-page fetch
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Failures absorbed so far, in the order they happened
    pub fn failures(&self) -> &[CrawlFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<CrawlFailure> {
        self.failures
    }

    /// Round trips issued so far
    pub fn round_trips(&self) -> u64 {
        self.throttle.round_trips()
    }

    fn record_failure(
        &mut self,
        stage: FailureStage,
        tracker_id: &str,
        issue_id: Option<&str>,
        error: &AtlasError,
    ) {
        self.failures
            .push(CrawlFailure::new(stage, tracker_id, issue_id, error.to_string()));
    }

    /// Reads the CSRF token from the current page
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The non-empty token
    /// * `Err(AtlasError)` - Evaluation failed or the token is empty
    pub async fn fetch_csrf_token(&self) -> Result<String> {
        let expression = &self.config.session.csrf_token_expression;
        tracing::debug!(expression = %expression, "Fetching CSRF token");

        let token: String = evaluate_into(self.executor, expression).await?;
        if token.trim().is_empty() {
            return Err(AtlasError::EmptyCsrfToken {
                expression: expression.clone(),
            });
        }
        Ok(token)
    }

    /// Resolves the root tracker by exact display-text match
    ///
    /// Loads the host page, obtains the CSRF token when enabled, then fetches
    /// the complete project listing in one in-page round trip. The first
    /// listing entry whose `text` equals the configured name wins.
    ///
    /// # Returns
    ///
    /// * `Ok(RootTrackerNode)` - The matched root with placeholder trackers
    /// * `Err(AtlasError::RootNotFound)` - No entry matched
    /// * `Err(AtlasError)` - Transport or decode failure
    pub async fn find_root_tracker(&mut self) -> Result<RootTrackerNode> {
        let config = self.config;
        let site = &config.site;
        tracing::info!(
            project_id = %site.project_id,
            "Resolving root tracker '{}'",
            site.root_tracker_name
        );

        self.throttle.before_round_trip().await;
        self.executor.navigate(&site.host).await?;

        if config.session.csrf && self.session.csrf_token.is_none() {
            let token = self.fetch_csrf_token().await?;
            self.session = Session::with_csrf_token(token);
        }

        self.throttle.before_round_trip().await;
        let options = FetchOptions::post_form(None).with_session(&self.session);
        let body = self
            .executor
            .fetch_in_page(&site.tracker_home_tree_url(), &options)
            .await?;

        let listing: Vec<RootTrackerNode> =
            serde_json::from_str(&body).map_err(|e| AtlasError::parse("tracker listing", e))?;
        tracing::debug!(
            count = listing.len(),
            names = ?listing.iter().map(|n| n.info.text.as_str()).collect::<Vec<_>>(),
            "Fetched tracker listing"
        );

        let root = listing
            .into_iter()
            .find(|node| node.info.text == site.root_tracker_name)
            .ok_or_else(|| AtlasError::RootNotFound {
                name: site.root_tracker_name.clone(),
            })?;

        tracing::info!(
            root_id = %root.info.id,
            trackers = root.children.len(),
            "Found root tracker"
        );
        Ok(root)
    }

    /// Fills a tracker with its direct issues from the tracker page
    ///
    /// On success every direct issue has run the has-children derivation.
    pub async fn fill_tracker_child(&mut self, tracker: &mut TrackerNode) -> Result<()> {
        let config = self.config;
        tracing::debug!(tracker_id = %tracker.info.id, "Filling tracker");

        self.throttle.before_round_trip().await;
        self.executor
            .navigate(&config.site.tracker_page_url(&tracker.info.id))
            .await?;
        self.executor
            .wait_for_global_defined(
                &config.page.tree_config_expression,
                config.page.wait_timeout(),
                config.page.poll_interval(),
            )
            .await?;

        let value = self
            .executor
            .evaluate(&config.page.tree_config_expression)
            .await?;
        tracker.children = decode_tree_config(value)?;
        tracker.assert_children();

        tracing::debug!(
            tracker_id = %tracker.info.id,
            issues = tracker.children.len(),
            "Tracker filled"
        );
        Ok(())
    }

    /// Like [`fill_tracker_child`](Self::fill_tracker_child), recording a
    /// failure instead of returning it
    ///
    /// # Returns
    ///
    /// `true` when the tracker was filled and belongs to the valid set
    pub async fn try_fill_tracker_child(&mut self, tracker: &mut TrackerNode) -> bool {
        match self.fill_tracker_child(tracker).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(tracker_id = %tracker.info.id, "Failed to fill tracker: {}", e);
                self.record_failure(FailureStage::Tracker, &tracker.info.id, None, &e);
                false
            }
        }
    }

    /// Fetches the direct children of one issue into `realChildren`
    ///
    /// No round trip is made when the issue has no children or they are
    /// already resolved.
    pub async fn fill_issue_child(&mut self, issue: &mut IssueNode, tracker_id: &str) -> Result<()> {
        if !issue.has_children || issue.is_children_resolved() {
            return Ok(());
        }
        let config = self.config;
        tracing::debug!(issue_id = %issue.id, tracker_id = %tracker_id, "Fetching issue children");

        let payload = tree_request(&config.site.project_id, tracker_id, &issue.id, "");
        let options = FetchOptions::post_form(Some(payload)).with_session(&self.session);

        self.throttle.before_round_trip().await;
        let body = self
            .executor
            .fetch_in_page(&config.site.tree_ajax_url(), &options)
            .await?;

        let mut children: Vec<IssueNode> = serde_json::from_str(&body)
            .map_err(|e| AtlasError::parse(format!("children of issue {}", issue.id), e))?;
        for child in &mut children {
            child.assert_children();
        }
        issue.real_children = children;
        Ok(())
    }

    /// Resolves an issue subtree depth-first, pre-order
    ///
    /// A node with `n` resolved children reports `weight / (n + 1)` for itself
    /// and hands the same share to each child; a leaf reports its whole
    /// weight. A failed fetch is recorded and the node is treated as a leaf,
    /// so the increments always sum to `weight`.
    ///
    /// # Arguments
    ///
    /// * `issue` - Subtree root, filled in place
    /// * `tracker_id` - Owning tracker, sent with every tree request
    /// * `weight` - Progress budget for the whole subtree
    /// * `on_progress` - Receives every increment in traversal order
    pub async fn recursive_fill_issue_child(
        &mut self,
        issue: &mut IssueNode,
        tracker_id: &str,
        weight: f64,
        on_progress: &mut ProgressCallback<'_>,
    ) {
        let mut stack: Vec<(Vec<usize>, f64)> = vec![(Vec::new(), weight)];

        while let Some((path, budget)) = stack.pop() {
            let node = descend_mut(issue, &path);

            if let Err(e) = self.fill_issue_child(node, tracker_id).await {
                tracing::warn!(
                    issue_id = %node.id,
                    tracker_id = %tracker_id,
                    "Failed to fetch issue children: {}",
                    e
                );
                self.record_failure(FailureStage::Children, tracker_id, Some(&node.id), &e);
                on_progress(budget, node);
                continue;
            }

            let count = node.real_children.len();
            if !node.has_children || count == 0 {
                on_progress(budget, node);
                continue;
            }

            let chunk = budget / (count + 1) as f64;
            on_progress(chunk, node);

            for index in (0..count).rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child_path, chunk));
            }
        }
    }

    async fn load_issue_content(&mut self, issue_id: &str) -> Result<String> {
        let config = self.config;
        let executor = self.executor;
        let selector = config.page.issue_content_selector.as_str();
        let timeout = config.page.wait_timeout();
        let url = config.site.issue_page_url(issue_id);

        self.throttle.before_round_trip().await;
        let fragments = tokio::time::timeout(timeout, async move {
            executor.navigate(&url).await?;
            executor.wait_for_selector(selector, timeout).await?;
            executor.inner_html(selector).await
        })
        .await
        .map_err(|_| ExecError::Timeout {
            what: format!("content of issue {}", issue_id),
            after: timeout,
        })??;

        fragments.into_iter().next().ok_or_else(|| {
            AtlasError::Network(ExecError::Evaluation {
                expression: selector.to_string(),
                message: "no element matched".to_string(),
            })
        })
    }

    /// Loads detail-page markup into every issue resolved under a tracker
    ///
    /// The budget is split evenly over all issues (counted transitively
    /// before the walk, with the same rule the walk follows), so each node
    /// reports exactly one equal increment. Issues that already carry content are credited without a
    /// round trip; a failed load leaves `content` empty.
    pub async fn fill_child_issue_content(
        &mut self,
        tracker: &mut TrackerNode,
        weight: f64,
        on_progress: &mut ProgressCallback<'_>,
    ) {
        let total = count_issues(&tracker.children);
        if total == 0 {
            return;
        }
        let increment = weight / total as f64;
        tracing::debug!(tracker_id = %tracker.info.id, issues = total, "Filling issue content");

        let tracker_id = tracker.info.id.clone();
        let mut stack: Vec<Vec<usize>> = (0..tracker.children.len()).rev().map(|i| vec![i]).collect();

        while let Some(path) = stack.pop() {
            let node = descend_mut(&mut tracker.children[path[0]], &path[1..]);

            if node.content.is_none() {
                match self.load_issue_content(&node.id).await {
                    Ok(content) => node.content = Some(content),
                    Err(e) => {
                        tracing::error!(
                            tracker_id = %tracker_id,
                            issue_id = %node.id,
                            "Failed to fill issue content: {}",
                            e
                        );
                        self.record_failure(FailureStage::Content, &tracker_id, Some(&node.id), &e);
                    }
                }
            }

            on_progress(increment, node);

            for index in (0..node.real_children.len()).rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push(child_path);
            }
        }
    }
}

/// Decodes a raw tree-config value into issue placeholders
///
/// Accepts either an object with a `children` list or the list itself.
pub fn decode_tree_config(value: Value) -> Result<Vec<IssueNode>> {
    serde_json::from_value::<TreeConfigData>(value)
        .map(TreeConfigData::into_children)
        .map_err(|e| AtlasError::parse("tree config", e))
}
