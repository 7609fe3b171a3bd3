//! Data-plane entity DTOs (spec §3 "Entities"). These are the shapes submit
//! modules read-merge-write through [`coordinator_client::CoordinatorClient`];
//! the entities themselves are collaborators outside the core, so only the
//! fields the merge rules in §4.4 actually touch are modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Uncrawled,
    Crawled,
}

/// A price observation, appended (never replaced) to a source-product's
/// history on every crawl (§4.4 "Crawl persist").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: f64,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProduct {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub gtin: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "ingredientsText", default)]
    pub ingredients_text: Option<String>,
    #[serde(rename = "crawlState", default = "default_crawl_state")]
    pub crawl_state: CrawlState,
    #[serde(rename = "priceHistory", default)]
    pub price_history: Vec<PriceHistoryEntry>,
}

fn default_crawl_state() -> CrawlState {
    CrawlState::Uncrawled
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVariant {
    pub id: String,
    #[serde(rename = "parentId")]
    pub parent_id: String,
    pub url: String,
    #[serde(rename = "canonicalUrl", default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub gtin: Option<String>,
    #[serde(rename = "crawledAt", default)]
    pub crawled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    #[serde(rename = "storeScore")]
    pub store_score: f64,
    #[serde(rename = "creatorScore")]
    pub creator_score: f64,
    pub trend: ScoreTrend,
    #[serde(rename = "recordedAt")]
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTrend {
    Increase,
    Stable,
    Drop,
}

impl ScoreTrend {
    /// Compare a new combined score against the previous entry's (§4.4
    /// "Aggregation persist": always prepend a score-history entry labeled
    /// against the previous one).
    pub fn classify(previous: f64, current: f64) -> Self {
        if current > previous {
            ScoreTrend::Increase
        } else if current < previous {
            ScoreTrend::Drop
        } else {
            ScoreTrend::Stable
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub gtin: Option<String>,
    #[serde(rename = "sourceProductIds", default)]
    pub source_product_ids: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(rename = "ingredientIds", default)]
    pub ingredient_ids: Vec<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(rename = "scoreHistory", default)]
    pub score_history: Vec<ScoreHistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(default)]
    pub gtin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoState {
    Unprocessed,
    Processed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "creatorId")]
    pub creator_id: String,
    #[serde(rename = "externalId")]
    pub external_id: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "externalId")]
    pub external_id: String,
    pub url: String,
    #[serde(default = "default_video_state")]
    pub state: VideoState,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
}

fn default_video_state() -> VideoState {
    VideoState::Unprocessed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "startSeconds")]
    pub start_seconds: f64,
    #[serde(rename = "endSeconds")]
    pub end_seconds: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMention {
    pub id: String,
    #[serde(rename = "snippetId")]
    pub snippet_id: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    pub sentiment: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_trend_classifies_against_previous() {
        assert_eq!(ScoreTrend::classify(0.5, 0.7), ScoreTrend::Increase);
        assert_eq!(ScoreTrend::classify(0.7, 0.5), ScoreTrend::Drop);
        assert_eq!(ScoreTrend::classify(0.5, 0.5), ScoreTrend::Stable);
    }
}
