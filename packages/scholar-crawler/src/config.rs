use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::site::{DEFAULT_BASE_URL, DEFAULT_SEARCH_URL};

/// What a traversal does when one entry or result fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailurePolicy {
    /// Propagate the failure and stop the run
    Abort,
    /// Log the failure, drop the item and keep going
    Skip,
}

/// Bounded waits for browser interactions.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Optional profile fields (homepage)
    pub optional_field: Duration,
    /// Result link of a search item
    pub result_key: Duration,
    /// Next-page control
    pub pagination: Duration,
    /// Citation dialog controls
    pub dialog: Duration,
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            optional_field: Duration::from_secs(1),
            result_key: Duration::from_secs(1),
            pagination: Duration::from_secs(10),
            dialog: Duration::from_secs(10),
            download: Duration::from_secs(30),
        }
    }
}

/// Configuration for the co-author graph walk
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    pub base_url: String,
    /// Deepest level still visited; seeds are level 0
    pub depth_limit: usize,
    pub order_by_year: bool,
    pub on_error: ItemFailurePolicy,
    pub timeouts: Timeouts,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            depth_limit: 1,
            order_by_year: true,
            on_error: ItemFailurePolicy::Abort,
            timeouts: Timeouts::default(),
        }
    }
}

impl ExploreConfig {
    pub fn new(depth_limit: usize) -> Self {
        Self {
            depth_limit,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_order_by_year(mut self, order_by_year: bool) -> Self {
        self.order_by_year = order_by_year;
        self
    }

    pub fn with_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Configuration for the paginated author search
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub search_url: String,
    pub page_limit: usize,
    /// Appended to every author query
    pub keyword: Option<String>,
    pub on_error: ItemFailurePolicy,
    pub timeouts: Timeouts,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            page_limit: 3,
            keyword: None,
            on_error: ItemFailurePolicy::Skip,
            timeouts: Timeouts::default(),
        }
    }
}

impl SearchConfig {
    pub fn new(page_limit: usize) -> Self {
        Self {
            page_limit,
            ..Default::default()
        }
    }

    pub fn with_search_url(mut self, search_url: impl Into<String>) -> Self {
        self.search_url = search_url.into();
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
