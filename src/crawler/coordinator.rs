//! Crawler coordinator - full crawl orchestration
//!
//! This module drives one crawl session from root resolution to the last
//! issue's content, including:
//! - Selecting the candidate trackers under the root
//! - Filling each candidate and keeping the valid ones
//! - Resolving issue subtrees and their content per valid tracker
//! - Splitting the progress budget across all of the above

use crate::config::Config;
use crate::crawler::{CrawlFailure, TreeCrawler};
use crate::executor::PageExecutor;
use crate::progress::{
    Phase, ProgressTracker, ISSUE_DISCOVERY_WEIGHT, TRACKER_DISCOVERY_WEIGHT,
};
use crate::tree::{count_issues, RootTrackerNode, TrackerNode};
use crate::Result;

/// Everything one crawl session produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// The root with every tracker, filled or not
    pub root: RootTrackerNode,

    /// Trackers whose fill succeeded, in root order
    pub trackers: Vec<TrackerNode>,

    /// Node-scoped failures absorbed along the way
    pub failures: Vec<CrawlFailure>,
}

impl CrawlOutcome {
    /// Total issues across the valid trackers
    pub fn issue_count(&self) -> usize {
        self.trackers
            .iter()
            .map(|tracker| count_issues(&tracker.children))
            .sum()
    }
}

/// Main crawl coordinator structure
pub struct Coordinator<'a, E: PageExecutor + ?Sized> {
    config: &'a Config,
    crawler: TreeCrawler<'a, E>,
}

impl<'a, E: PageExecutor + ?Sized> Coordinator<'a, E> {
    pub fn new(executor: &'a E, config: &'a Config) -> Self {
        Self {
            config,
            crawler: TreeCrawler::new(executor, config),
        }
    }

    /// Returns true when a root child should be filled
    ///
    /// The icon filter and the single-tracker filter both apply when set.
    fn is_candidate(&self, tracker: &TrackerNode) -> bool {
        let icon_matches = match &self.config.site.tracker_icon {
            Some(icon) => tracker.info.icon == *icon,
            None => true,
        };
        let id_matches = match &self.config.crawler.only_tracker {
            Some(id) => tracker.info.matches_id(id),
            None => true,
        };
        icon_matches && id_matches
    }

    /// Runs the crawl
    ///
    /// Tracker discovery is worth 30% of the progress total, split evenly
    /// over candidate trackers (after the icon and single-tracker filters). The remaining 70% is split evenly over valid
    /// trackers, half for resolving issue children and half for content.
    /// Floating-point residue is left for the caller to credit on completion.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The populated tree
    /// * `Err(AtlasError)` - Root resolution failed
    pub async fn run(mut self, progress: &mut ProgressTracker<'_>) -> Result<CrawlOutcome> {
        progress.begin_phase(Phase::ResolveRoot);
        let mut root = self.crawler.find_root_tracker().await?;

        let candidates: Vec<usize> = root
            .children
            .iter()
            .enumerate()
            .filter(|(_, tracker)| self.is_candidate(tracker))
            .map(|(index, _)| index)
            .collect();
        tracing::info!(
            trackers = root.children.len(),
            candidates = candidates.len(),
            "Filling trackers"
        );
        if let (Some(id), true) = (&self.config.crawler.only_tracker, candidates.is_empty()) {
            tracing::warn!(tracker = %id, "No tracker under the root matches the partial crawl id");
        }

        progress.set_phase(Phase::FillTrackers);
        let mut valid = Vec::new();
        if !candidates.is_empty() {
            let share = TRACKER_DISCOVERY_WEIGHT / candidates.len() as f64;
            for index in candidates {
                let tracker = &mut root.children[index];
                if self.crawler.try_fill_tracker_child(tracker).await {
                    valid.push(index);
                }
                progress.advance(share, Some(tracker.info.id.as_str()));
            }
        }
        progress.advance_to(TRACKER_DISCOVERY_WEIGHT);
        tracing::info!(valid = valid.len(), "Tracker discovery finished");

        progress.begin_phase(Phase::FindIssues);
        if !valid.is_empty() {
            let share = ISSUE_DISCOVERY_WEIGHT / valid.len() as f64;
            for &index in &valid {
                self.crawl_tracker(&mut root.children[index], share, progress)
                    .await;
            }
        }

        let trackers = valid
            .iter()
            .map(|&index| root.children[index].clone())
            .collect();
        let failures = self.crawler.into_failures();
        if !failures.is_empty() {
            tracing::warn!(failures = failures.len(), "Crawl finished with absorbed failures");
        }

        Ok(CrawlOutcome {
            root,
            trackers,
            failures,
        })
    }

    async fn crawl_tracker(
        &mut self,
        tracker: &mut TrackerNode,
        share: f64,
        progress: &mut ProgressTracker<'_>,
    ) {
        let tracker_id = tracker.info.id.clone();
        if tracker.children.is_empty() {
            tracing::debug!(tracker_id = %tracker_id, "Tracker has no issues");
            progress.advance(share, Some(tracker_id.as_str()));
            return;
        }

        let half = share / 2.0;
        let per_issue = half / tracker.children.len() as f64;
        let request_id = tracker.info.request_id();

        progress.set_phase(Phase::FindIssues);
        for issue in tracker.children.iter_mut() {
            self.crawler
                .recursive_fill_issue_child(issue, &request_id, per_issue, &mut |increment, node| {
                    progress.advance(increment, Some(node.id.as_str()))
                })
                .await;
        }
        tracing::info!(
            tracker_id = %tracker_id,
            issues = count_issues(&tracker.children),
            "Issue tree resolved"
        );

        progress.set_phase(Phase::FillContent);
        self.crawler
            .fill_child_issue_content(tracker, half, &mut |increment, node| {
                progress.advance(increment, Some(node.id.as_str()))
            })
            .await;
    }
}

/// Runs a complete crawl with the given executor
///
/// # Arguments
///
/// * `executor` - Page session to drive
/// * `config` - The crawler configuration
/// * `progress` - Receives every progress change
pub async fn run_crawl<E: PageExecutor + ?Sized>(
    executor: &E,
    config: &Config,
    progress: &mut ProgressTracker<'_>,
) -> Result<CrawlOutcome> {
    Coordinator::new(executor, config).run(progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::{test_config, FakeExecutor};
    use crate::crawler::FailureStage;
    use crate::progress::ProgressEvent;
    use crate::AtlasError;
    use serde_json::json;

    fn site_with_two_trackers(config: &Config) -> FakeExecutor {
        FakeExecutor::new(config)
            .with_listing(json!([{
                "id": "1",
                "text": "Software Requirements",
                "children": [
                    {"id": "10", "trackerId": 4410, "text": "Brakes", "icon": "/doc.png"},
                    {"id": "11", "text": "Folder", "icon": "/folder.png"},
                    {"id": "12", "text": "Steering", "icon": "/doc.png"}
                ]
            }]))
            .with_tracker_tree(
                "10",
                json!({"children": [{"id": "100", "children": true}, {"id": "101"}]}),
            )
            .with_tracker_tree("12", json!([{"id": "120"}]))
            .with_children("100", json!([{"id": "102", "text": "see ISSUE:120"}]))
            .with_content("100", "<p>a</p>")
            .with_content("101", "<p>b</p>")
            .with_content("102", "<p>c</p>")
            .with_content("120", "<p>d</p>")
    }

    #[tokio::test]
    async fn test_full_crawl_populates_tree() {
        let config = test_config();
        let executor = site_with_two_trackers(&config);
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut sink = |event: &ProgressEvent| events.push(event.clone());

        let outcome = {
            let mut progress = ProgressTracker::new(&mut sink);
            let outcome = run_crawl(&executor, &config, &mut progress).await.unwrap();
            progress.finish();
            outcome
        };

        assert_eq!(outcome.root.children.len(), 3);
        assert_eq!(outcome.trackers.len(), 2);
        assert_eq!(outcome.issue_count(), 4);
        assert!(outcome.failures.iter().all(|f| f.stage == FailureStage::Tracker));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].tracker_id, "11");

        let brakes = &outcome.trackers[0];
        assert_eq!(brakes.children[0].real_children[0].id, "102");
        assert_eq!(
            brakes.children[0].real_children[0].content.as_deref(),
            Some("<p>c</p>")
        );
        assert_eq!(outcome.root.children[0], *brakes);

        let percents: Vec<f64> = events.iter().map(|e| e.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100.0);
        assert!(percents.iter().any(|p| (*p - 30.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_tree_requests_use_numeric_tracker_id() {
        let config = test_config();
        let executor = site_with_two_trackers(&config);
        let mut sink = crate::progress::NullSink;
        let mut progress = ProgressTracker::new(&mut sink);

        run_crawl(&executor, &config, &mut progress).await.unwrap();
        let bodies = executor.fetch_bodies();
        assert!(bodies.iter().any(|b| b.contains("tracker_id=4410")));
    }

    #[tokio::test]
    async fn test_icon_filter_limits_candidates() {
        let mut config = test_config();
        config.site.tracker_icon = Some("/doc.png".to_string());
        let executor = site_with_two_trackers(&config);
        let mut sink = crate::progress::NullSink;
        let mut progress = ProgressTracker::new(&mut sink);

        let outcome = run_crawl(&executor, &config, &mut progress).await.unwrap();
        assert_eq!(outcome.trackers.len(), 2);
        assert!(outcome.failures.is_empty());
        assert!(!executor
            .navigations()
            .iter()
            .any(|url| url.ends_with("/cb/tracker/11")));
    }

    #[tokio::test]
    async fn test_partial_crawl_fetches_only_selected_tracker() {
        let mut config = test_config();
        config.crawler.only_tracker = Some("4410".to_string());
        let executor = site_with_two_trackers(&config);
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut sink = |event: &ProgressEvent| events.push(event.clone());

        let outcome = {
            let mut progress = ProgressTracker::new(&mut sink);
            run_crawl(&executor, &config, &mut progress).await.unwrap()
        };

        assert_eq!(outcome.root.children.len(), 3);
        assert_eq!(outcome.trackers.len(), 1);
        assert_eq!(outcome.trackers[0].info.id, "10");
        assert!(outcome.failures.is_empty());

        let tracker_pages: Vec<String> = executor
            .navigations()
            .into_iter()
            .filter(|url| url.contains("/cb/tracker/"))
            .collect();
        assert_eq!(tracker_pages.len(), 1);
        assert!(tracker_pages[0].ends_with("/cb/tracker/10"));
        assert!(!executor.navigations().iter().any(|url| url.ends_with("/cb/issue/120")));

        // The single candidate carries the whole discovery budget
        let filled = events
            .iter()
            .find(|e| e.phase == Phase::FillTrackers && e.node_id.as_deref() == Some("10"))
            .unwrap();
        assert!((filled.percent - TRACKER_DISCOVERY_WEIGHT).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_partial_crawl_with_unknown_id_fills_nothing() {
        let mut config = test_config();
        config.crawler.only_tracker = Some("999".to_string());
        let executor = site_with_two_trackers(&config);
        let mut sink = crate::progress::NullSink;
        let mut progress = ProgressTracker::new(&mut sink);

        let outcome = run_crawl(&executor, &config, &mut progress).await.unwrap();
        assert_eq!(outcome.root.children.len(), 3);
        assert!(outcome.trackers.is_empty());
        assert!(!executor.navigations().iter().any(|url| url.contains("/cb/tracker/")));
    }

    #[tokio::test]
    async fn test_progress_reaches_budgets() {
        let mut config = test_config();
        config.site.tracker_icon = Some("/doc.png".to_string());
        let executor = site_with_two_trackers(&config);
        let mut last = 0.0;
        let mut sink = |event: &ProgressEvent| last = event.percent;
        {
            let mut progress = ProgressTracker::new(&mut sink);
            run_crawl(&executor, &config, &mut progress).await.unwrap();
            assert!((progress.percent() - 100.0).abs() < 1e-9);
        }
        assert!((last - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_malformed_children_do_not_abort() {
        let config = test_config();
        let executor = FakeExecutor::new(&config)
            .with_listing(json!([{"id": "1", "text": "Software Requirements",
                "children": [{"id": "10"}]}]))
            .with_tracker_tree("10", json!({"children": [{"id": "100", "children": true}]}))
            .with_raw_children("100", "<html>session expired</html>")
            .with_content("100", "<p>x</p>");
        let mut sink = crate::progress::NullSink;
        let mut progress = ProgressTracker::new(&mut sink);

        let outcome = run_crawl(&executor, &config, &mut progress).await.unwrap();
        assert_eq!(outcome.trackers.len(), 1);
        assert!(outcome.trackers[0].children[0].real_children.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, FailureStage::Children);
        assert!(outcome.failures[0].message.contains("children of issue 100"));
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let config = test_config();
        let executor = FakeExecutor::new(&config).with_listing(json!([]));
        let mut sink = crate::progress::NullSink;
        let mut progress = ProgressTracker::new(&mut sink);

        let result = run_crawl(&executor, &config, &mut progress).await;
        assert!(matches!(result, Err(AtlasError::RootNotFound { .. })));
    }
}
