//! Driver traits (SPEC_FULL §F): the out-of-scope external collaborators
//! (scrapers, discovery crawlers, video hosts, speech-to-text/LLM services)
//! invoked from inside handlers. Only a deterministic in-memory `fake`
//! implementation of each ships here, used by this crate's own tests — a
//! production implementation is a separate concern, same as the teacher
//! keeps `chiavdf-fast`'s native proving behind a narrow function boundary
//! that `worker.rs` never has to know the internals of.

use async_trait::async_trait;
use serde_json::Value;

/// Result of scraping one source-variant's page (§4.2/§4.4 "Crawl").
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub ingredients_text: Option<String>,
    pub canonical_url: Option<String>,
    /// Sibling variant URLs discovered on the same page (different size/flavor).
    pub sibling_urls: Vec<String>,
}

#[async_trait]
pub trait CrawlDriver: Send + Sync {
    async fn scrape(&self, url: &str) -> anyhow::Result<CrawlResult>;
}

/// One page of a discovery crawl (§4.2 "Discovery").
#[derive(Debug, Clone)]
pub struct DiscoveryPage {
    pub variant_urls: Vec<String>,
    pub next_driver_progress: Value,
    pub exhausted: bool,
}

#[async_trait]
pub trait DiscoveryDriver: Send + Sync {
    async fn fetch_page(&self, source_url: &str, driver_progress: &Value) -> anyhow::Result<DiscoveryPage>;
}

/// Ingredient search results for one term/page (§4.2 "Ingredient-discovery").
#[derive(Debug, Clone)]
pub struct IngredientPage {
    pub names: Vec<String>,
    /// Non-empty when the term is too broad and should be subdivided instead
    /// of paged (e.g. a reference source that caps result pages per term).
    pub subdivide_into: Vec<String>,
    /// False once this was the term's last page.
    pub has_more_pages: bool,
}

#[async_trait]
pub trait IngredientDriver: Send + Sync {
    async fn search(&self, term: &str, page: u32) -> anyhow::Result<IngredientPage>;
}

/// One fetched video (§4.2/§4.4 "Video-discovery").
#[derive(Debug, Clone)]
pub struct DiscoveredVideo {
    pub external_id: String,
    pub url: String,
    pub thumbnail_bytes: Option<Vec<u8>>,
}

#[async_trait]
pub trait VideoDiscoveryDriver: Send + Sync {
    /// Fetch videos at `[offset, offset + limit)` for a channel, and the
    /// channel's current avatar image (refreshed on every tick per §4.4).
    async fn list_videos(
        &self,
        channel_external_id: &str,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<(Vec<DiscoveredVideo>, bool)>;

    async fn fetch_avatar(&self, channel_external_id: &str) -> anyhow::Result<Vec<u8>>;
}

/// A transcript snippet plus the products it appears to mention, as produced
/// by speech-to-text + sentiment/entity-matching (§4.2/§4.4 "Video-processing").
#[derive(Debug, Clone)]
pub struct ProcessedSnippet {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub mentions: Vec<DetectedMention>,
}

#[derive(Debug, Clone)]
pub struct DetectedMention {
    pub gtin: Option<String>,
    /// Free-text product name, used for an LLM-driven match when `gtin` is absent.
    pub name_hint: Option<String>,
    pub sentiment: f64,
}

#[async_trait]
pub trait VideoProcessingDriver: Send + Sync {
    async fn process(&self, video_url: &str) -> anyhow::Result<Vec<ProcessedSnippet>>;

    /// Resolve a free-text product name to a known product id when no GTIN
    /// was detected (§4.4: "else by an LLM-driven match function").
    async fn match_product_by_name(&self, name_hint: &str) -> anyhow::Result<Option<String>>;
}

pub mod fake {
    //! Deterministic in-memory driver implementations. Used by this crate's
    //! own tests, and also wired into the `worker` binary as the default
    //! collaborator set — the real scraper/LLM/media/STT integrations are
    //! out of scope here (§1) and are the one seam a deployment is expected
    //! to replace.

    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    pub struct FakeCrawlDriver {
        pub pages: HashMap<String, CrawlResult>,
    }

    #[async_trait]
    impl CrawlDriver for FakeCrawlDriver {
        async fn scrape(&self, url: &str) -> anyhow::Result<CrawlResult> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("fake driver has no page for {url}"))
        }
    }

    pub struct FakeDiscoveryDriver {
        pub pages: Mutex<Vec<DiscoveryPage>>,
    }

    #[async_trait]
    impl DiscoveryDriver for FakeDiscoveryDriver {
        async fn fetch_page(&self, _source_url: &str, _driver_progress: &Value) -> anyhow::Result<DiscoveryPage> {
            let mut pages = self.pages.lock().await;
            if pages.is_empty() {
                anyhow::bail!("fake discovery driver exhausted");
            }
            Ok(pages.remove(0))
        }
    }

    pub struct FakeIngredientDriver {
        pub results: HashMap<String, IngredientPage>,
    }

    #[async_trait]
    impl IngredientDriver for FakeIngredientDriver {
        async fn search(&self, term: &str, _page: u32) -> anyhow::Result<IngredientPage> {
            self.results
                .get(term)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("fake driver has no results for {term}"))
        }
    }

    pub struct FakeVideoDiscoveryDriver {
        pub videos: Vec<DiscoveredVideo>,
    }

    #[async_trait]
    impl VideoDiscoveryDriver for FakeVideoDiscoveryDriver {
        async fn list_videos(
            &self,
            _channel_external_id: &str,
            offset: u64,
            limit: u32,
        ) -> anyhow::Result<(Vec<DiscoveredVideo>, bool)> {
            let start = offset as usize;
            if start >= self.videos.len() {
                return Ok((Vec::new(), true));
            }
            let end = (start + limit as usize).min(self.videos.len());
            let page = self.videos[start..end].to_vec();
            let exhausted = end >= self.videos.len();
            Ok((page, exhausted))
        }

        async fn fetch_avatar(&self, _channel_external_id: &str) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0u8; 4])
        }
    }

    pub struct FakeVideoProcessingDriver {
        pub snippets: Vec<ProcessedSnippet>,
    }

    #[async_trait]
    impl VideoProcessingDriver for FakeVideoProcessingDriver {
        async fn process(&self, _video_url: &str) -> anyhow::Result<Vec<ProcessedSnippet>> {
            Ok(self.snippets.clone())
        }

        async fn match_product_by_name(&self, _name_hint: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }
}
