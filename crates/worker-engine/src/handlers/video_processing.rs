//! Video-processing handler (spec §4.3/§4.4). Resolves each detected
//! mention to a product id by GTIN when available, else via the driver's
//! name-matching function.

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::video_processing::VideoProcessingItem;
use crate::drivers::VideoProcessingDriver;
use crate::entities::ProductVariant;
use crate::heartbeat::Heartbeat;
use coordinator_client::{Compare, CoordinatorClient, FindOptions};

const PRODUCT_VARIANTS: &str = "product-variants";

pub struct ResolvedMention {
    pub product_id: Option<String>,
    pub sentiment: f64,
}

pub struct ResolvedSnippet {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub mentions: Vec<ResolvedMention>,
}

pub struct VideoProcessingOutcome {
    pub video_id: String,
    pub snippets: Vec<ResolvedSnippet>,
}

pub async fn handle(
    batch: Batch<VideoProcessingItem>,
    driver: &dyn VideoProcessingDriver,
    client: &CoordinatorClient,
    heartbeat: &Heartbeat<'_>,
) -> HandlerOutput<VideoProcessingOutcome, ()> {
    let mut results = Vec::with_capacity(batch.items.len());

    for (index, item) in batch.items.into_iter().enumerate() {
        let outcome = match driver.process(&item.url).await {
            Ok(snippets) => {
                let mut resolved = Vec::with_capacity(snippets.len());
                for snippet in snippets {
                    let mut mentions = Vec::with_capacity(snippet.mentions.len());
                    for mention in snippet.mentions {
                        let product_id = if let Some(gtin) = &mention.gtin {
                            resolve_by_gtin(client, gtin).await
                        } else if let Some(name) = &mention.name_hint {
                            driver.match_product_by_name(name).await.unwrap_or(None)
                        } else {
                            None
                        };
                        mentions.push(ResolvedMention {
                            product_id,
                            sentiment: mention.sentiment,
                        });
                    }
                    resolved.push(ResolvedSnippet {
                        start_seconds: snippet.start_seconds,
                        end_seconds: snippet.end_seconds,
                        text: snippet.text,
                        mentions,
                    });
                }
                Ok(VideoProcessingOutcome {
                    video_id: item.video_id.clone(),
                    snippets: resolved,
                })
            }
            Err(err) => {
                tracing::warn!(video_id = %item.video_id, error = %err, "video processing failed");
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
        next_cursor: (),
        scope_exhausted: false,
    }
}

/// Look up the `products` id referenced by a detected GTIN. Unlike
/// aggregation's `find_or_create_product`, this never creates — a mention
/// for a product aggregation hasn't produced yet is simply unresolved.
async fn resolve_by_gtin(client: &CoordinatorClient, gtin: &str) -> Option<String> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("gtin", gtin.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<ProductVariant>(PRODUCT_VARIANTS, &opts).await.ok()?;
    existing.docs.into_iter().next().map(|variant| variant.product_id)
}
