//! Discovery handler (spec §4.3/§4.2). One page request per tick; the
//! driver's opaque `driverProgress` is round-tripped without inspection.

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::discovery::DiscoveryItem;
use crate::drivers::DiscoveryDriver;
use crate::heartbeat::Heartbeat;
use worker_core::cursor::DiscoveryCursor;

pub struct DiscoveryOutcome {
    pub variant_urls: Vec<String>,
}

pub async fn handle(
    batch: Batch<DiscoveryItem>,
    driver: &dyn DiscoveryDriver,
    heartbeat: &Heartbeat<'_>,
) -> HandlerOutput<DiscoveryOutcome, DiscoveryCursor> {
    let mut results = Vec::with_capacity(batch.items.len());
    let mut last_cursor = DiscoveryCursor::default();

    for (index, item) in batch.items.into_iter().enumerate() {
        let outcome = match driver.fetch_page(&item.source_url, &item.cursor.driver_progress).await {
            Ok(page) => {
                last_cursor = DiscoveryCursor {
                    current_url_index: if page.exhausted {
                        item.cursor.current_url_index + 1
                    } else {
                        item.cursor.current_url_index
                    },
                    driver_progress: page.next_driver_progress,
                };
                Ok(DiscoveryOutcome {
                    variant_urls: page.variant_urls,
                })
            }
            Err(err) => {
                tracing::warn!(source_url = %item.source_url, error = %err, "discovery page fetch failed");
                last_cursor = item.cursor.clone();
                Err(format!("{err:#}"))
            }
        };
        results.push(ItemResult {
            input_index: index,
            outcome,
        });
        heartbeat.beat().await;
    }

    HandlerOutput {
        results,
        next_cursor: last_cursor,
        scope_exhausted: false,
    }
}
