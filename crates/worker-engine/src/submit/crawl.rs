//! Crawl persist (spec §4.4 "Crawl persist"). Parent `crawlState` stays
//! `uncrawled` until every one of its variants — including siblings created
//! by this very tick — has a non-null `crawledAt`.

use chrono::Utc;
use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::entities::{PriceHistoryEntry, SourceProduct, SourceVariant};
use crate::handlers::crawl::CrawlOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const VARIANTS: &str = "source-variants";
const SOURCE_PRODUCTS: &str = "source-products";

pub async fn submit(client: &CoordinatorClient, job: &Job, output: HandlerOutput<CrawlOutcome, ()>) -> anyhow::Result<()> {
    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(variant_id = %outcome.variant_id, error = %err, "crawl persist failed");
                    errors += 1;
                }
            },
            Err(_) => errors += 1,
        }
    }

    finish(
        client,
        job,
        BatchSummary {
            success_count: success,
            error_count: errors,
            next_cursor: (),
            scope_exhausted: false,
        },
    )
    .await
}

async fn persist_one(client: &CoordinatorClient, outcome: &CrawlOutcome) -> anyhow::Result<()> {
    let result = &outcome.result;

    let variant: SourceVariant = client.find_by_id(VARIANTS, &outcome.variant_id).await?;
    let variant_update = serde_json::json!({
        "crawledAt": Utc::now(),
        "canonicalUrl": result.canonical_url.clone().or(variant.canonical_url),
    });
    let _: SourceVariant = client.update_by_id(VARIANTS, &outcome.variant_id, &variant_update, &[]).await?;

    let parent: SourceProduct = client.find_by_id(SOURCE_PRODUCTS, &outcome.parent_id).await?;
    let mut price_history = parent.price_history.clone();
    if let Some(price) = result.price {
        price_history.push(PriceHistoryEntry {
            price,
            observed_at: Utc::now(),
        });
    }
    let parent_update = serde_json::json!({
        "title": parent.title.or_else(|| result.title.clone()),
        "ingredientsText": parent.ingredients_text.or_else(|| result.ingredients_text.clone()),
        "priceHistory": price_history,
    });
    let _: SourceProduct = client.update_by_id(SOURCE_PRODUCTS, &outcome.parent_id, &parent_update, &[]).await?;

    for sibling_url in &result.sibling_urls {
        create_sibling_if_new(client, &outcome.parent_id, sibling_url).await?;
    }

    maybe_mark_parent_crawled(client, &outcome.parent_id).await?;
    Ok(())
}

async fn create_sibling_if_new(client: &CoordinatorClient, parent_id: &str, url: &str) -> anyhow::Result<()> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("url", url.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<SourceVariant>(VARIANTS, &opts).await?;
    if !existing.docs.is_empty() {
        return Ok(());
    }
    let payload = serde_json::json!({
        "parentId": parent_id,
        "url": url,
    });
    let _: SourceVariant = client.create(VARIANTS, &payload, None).await?;
    Ok(())
}

async fn maybe_mark_parent_crawled(client: &CoordinatorClient, parent_id: &str) -> anyhow::Result<()> {
    let opts = FindOptions {
        r#where: Some(coordinator_client::Where::and([
            Compare::equals("parentId", parent_id.to_string()),
            Compare::exists("crawledAt", false),
        ])),
        limit: Some(1),
        sort: None,
    };
    let still_pending = client.find::<SourceVariant>(VARIANTS, &opts).await?;
    if still_pending.docs.is_empty() {
        let update = serde_json::json!({ "crawlState": "crawled" });
        let _: SourceProduct = client.update_by_id(SOURCE_PRODUCTS, parent_id, &update, &[]).await?;
    }
    Ok(())
}
