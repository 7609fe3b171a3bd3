//! Per-type progress cursors (spec §4.2). Each is a plain JSON-serializable
//! struct embedded in `Job::progress`; generic code never inspects these,
//! only the matching work builder in `worker-engine` does.
//!
//! Per the Resume-state evolution open question (§9, decided in
//! DESIGN.md): a cursor whose shape fails to parse is treated as "restart
//! from scratch" rather than a hard error, via [`parse_cursor`]'s
//! `unwrap_or_default` fallback.

use std::collections::VecDeque;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Decode a job's opaque `progress` value into a typed cursor, falling back
/// to the type's default on any shape mismatch (stale version, corrupt
/// state, or a job that has never been ticked).
pub fn parse_cursor<T: DeserializeOwned + Default>(progress: &serde_json::Value) -> T {
    if progress.is_null() {
        return T::default();
    }
    serde_json::from_value(progress.clone()).unwrap_or_default()
}

/// Crawl scope (spec §4.2 "Crawl"). Crawl has no numeric cursor — the
/// implicit work queue (uncrawled variants) is re-derived every tick — but
/// does carry scope parameters that narrow or reset that queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CrawlScope {
    All,
    SelectedUrls { urls: Vec<String> },
    SelectedGtins { gtins: Vec<String> },
    FromDiscovery,
    /// Resets previously-crawled parents back to `uncrawled` and clears
    /// child `crawledAt` timestamps, optionally filtered by age.
    Recrawl {
        #[serde(default)]
        min_crawl_age_seconds: Option<u64>,
    },
}

impl CrawlScope {
    pub fn min_crawl_age(&self) -> Option<Duration> {
        match self {
            CrawlScope::Recrawl { min_crawl_age_seconds: Some(s) } => Some(Duration::from_secs(*s)),
            _ => None,
        }
    }
}

impl Default for CrawlScope {
    fn default() -> Self {
        CrawlScope::All
    }
}

/// Discovery cursor (spec §4.2 "Discovery"). `driver_progress` is opaque —
/// only the matching driver understands its shape; the builder passes it
/// through unexamined.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiscoveryCursor {
    pub current_url_index: usize,
    #[serde(default)]
    pub driver_progress: serde_json::Value,
}

impl DiscoveryCursor {
    pub fn is_complete(&self, source_urls_len: usize) -> bool {
        self.current_url_index >= source_urls_len
    }
}

/// Ingredient-discovery cursor (spec §4.2 "Ingredient-discovery"). Terms can
/// recursively subdivide; sub-terms are re-enqueued at the *head* of
/// `term_queue` so they're processed before siblings already queued.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IngredientDiscoveryCursor {
    pub current_term: String,
    pub current_page: u32,
    pub total_pages_for_term: u32,
    pub term_queue: VecDeque<String>,
}

impl IngredientDiscoveryCursor {
    /// Replace the current term's remaining subdivision with `sub_terms`,
    /// enqueued ahead of whatever is already queued.
    pub fn subdivide(&mut self, sub_terms: impl IntoIterator<Item = String>) {
        let mut head: VecDeque<String> = sub_terms.into_iter().collect();
        head.extend(self.term_queue.drain(..));
        self.term_queue = head;
    }

    pub fn is_complete(&self) -> bool {
        self.current_term.is_empty() && self.term_queue.is_empty()
    }
}

/// Video-discovery cursor (spec §4.2 "Video-discovery"): a 0-based,
/// channel-relative offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct VideoDiscoveryCursor {
    pub current_offset: u64,
}

impl VideoDiscoveryCursor {
    pub fn is_complete(&self, max_videos: Option<u64>, driver_reports_end: bool) -> bool {
        driver_reports_end || max_videos.is_some_and(|max| self.current_offset >= max)
    }
}

/// Aggregation cursor (spec §4.2 "Aggregation"). `type = all` scans
/// source-products by a monotonic id cursor; `selected_gtins` has no
/// cursor — the scope is fixed and processed (subject to `itemsPerTick`) in
/// one or more ticks over the fixed id list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AggregationCursor {
    All { last_checked_source_id: Option<String> },
    SelectedGtins { remaining_gtins: Vec<String> },
}

impl Default for AggregationCursor {
    fn default() -> Self {
        AggregationCursor::All {
            last_checked_source_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cursor_falls_back_on_shape_mismatch() {
        let corrupt = serde_json::json!({ "not": "a cursor" });
        let cursor: DiscoveryCursor = parse_cursor(&corrupt);
        assert_eq!(cursor, DiscoveryCursor::default());
    }

    #[test]
    fn parse_cursor_round_trips() {
        let cursor = DiscoveryCursor {
            current_url_index: 2,
            driver_progress: serde_json::json!({"page": 3}),
        };
        let value = serde_json::to_value(&cursor).unwrap();
        let parsed: DiscoveryCursor = parse_cursor(&value);
        assert_eq!(parsed, cursor);
    }

    #[test]
    fn ingredient_cursor_subdivision_is_head_insertion() {
        let mut cursor = IngredientDiscoveryCursor {
            current_term: "A".to_string(),
            current_page: 1,
            total_pages_for_term: 3,
            term_queue: VecDeque::from(["B".to_string()]),
        };
        cursor.subdivide(["AA".to_string(), "AB".to_string()]);
        assert_eq!(
            cursor.term_queue,
            VecDeque::from(["AA".to_string(), "AB".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn video_discovery_completion() {
        let cursor = VideoDiscoveryCursor { current_offset: 100 };
        assert!(cursor.is_complete(Some(100), false));
        assert!(!cursor.is_complete(Some(200), false));
        assert!(cursor.is_complete(None, true));
    }
}
