//! Discovery persist (spec §4.4 "Discovery persist"). New variant URLs get
//! a parent source-product and a default variant created together, tagged
//! `fromDiscovery` so a later `scope = from_discovery` crawl job picks them
//! up; URLs already tracked are left alone.

use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use worker_core::cursor::DiscoveryCursor;
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::entities::{SourceProduct, SourceVariant};
use crate::handlers::discovery::DiscoveryOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const VARIANTS: &str = "source-variants";
const SOURCE_PRODUCTS: &str = "source-products";

pub async fn submit(
    client: &CoordinatorClient,
    job: &Job,
    output: HandlerOutput<DiscoveryOutcome, DiscoveryCursor>,
) -> anyhow::Result<()> {
    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "discovery persist failed");
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
            next_cursor: output.next_cursor,
            scope_exhausted: output.scope_exhausted,
        },
    )
    .await
}

async fn persist_one(client: &CoordinatorClient, outcome: &DiscoveryOutcome) -> anyhow::Result<()> {
    for url in &outcome.variant_urls {
        create_if_new(client, url).await?;
    }
    Ok(())
}

async fn create_if_new(client: &CoordinatorClient, url: &str) -> anyhow::Result<()> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("url", url.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<SourceVariant>(VARIANTS, &opts).await?;
    if !existing.docs.is_empty() {
        return Ok(());
    }

    let parent_payload = serde_json::json!({ "source": "discovery", "crawlState": "uncrawled" });
    let parent: SourceProduct = client.create(SOURCE_PRODUCTS, &parent_payload, None).await?;

    let variant_payload = serde_json::json!({
        "parentId": parent.id,
        "url": url,
        "fromDiscovery": true,
    });
    let _: SourceVariant = client.create(VARIANTS, &variant_payload, None).await?;
    Ok(())
}
