//! Crawl handler (spec §4.3). Sequential per variant; per-item failures are
//! recorded, never abort the batch.

use std::time::Instant;

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::crawl::CrawlItem;
use crate::drivers::{CrawlDriver, CrawlResult};
use crate::heartbeat::{Heartbeat, Watchdog};

pub struct CrawlOutcome {
    pub variant_id: String,
    pub parent_id: String,
    pub result: CrawlResult,
}

pub async fn handle(
    batch: Batch<CrawlItem>,
    driver: &dyn CrawlDriver,
    heartbeat: &Heartbeat<'_>,
    watchdog: &Watchdog,
) -> HandlerOutput<CrawlOutcome, ()> {
    let mut results = Vec::with_capacity(batch.items.len());

    for (index, item) in batch.items.into_iter().enumerate() {
        let CrawlItem { variant_id, parent_id, url } = item;
        let started = Instant::now();
        let outcome = match driver.scrape(&url).await {
            Ok(result) => Ok(CrawlOutcome {
                variant_id,
                parent_id,
                result,
            }),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "crawl item failed");
                Err(format!("{err:#}"))
            }
        };
        watchdog.check(&url, started.elapsed());
        results.push(ItemResult {
            input_index: index,
            outcome,
        });
        heartbeat.beat().await;
    }

    HandlerOutput {
        results,
        next_cursor: (),
        scope_exhausted: false,
    }
}
