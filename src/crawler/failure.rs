//! Absorbed crawl failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Crawl step a failure was absorbed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    /// Tracker page fill; the tracker is excluded from the valid set
    Tracker,

    /// Issue children fetch; the issue is treated as a leaf
    Children,

    /// Issue detail page; `content` stays empty
    Content,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Children => "children",
            Self::Content => "content",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tracker" => Some(Self::Tracker),
            "children" => Some(Self::Children),
            "content" => Some(Self::Content),
            _ => None,
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node-scoped failure the crawl logged and skipped past
///
/// Kept so operators can target a partial re-crawl at exactly the subtrees
/// that came back empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub stage: FailureStage,
    pub tracker_id: String,
    pub issue_id: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl CrawlFailure {
    pub fn new(
        stage: FailureStage,
        tracker_id: impl Into<String>,
        issue_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            tracker_id: tracker_id.into(),
            issue_id: issue_id.map(str::to_string),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}
