//! Aggregation persist (spec §4.4 "Aggregation persist"). The "scope=full"
//! enrichment the spec names is treated as always-on here (see DESIGN.md):
//! every tick recomputes ingredient/classification from whatever the
//! handler found, merging rather than overwriting, and always prepends a
//! score-history entry.

use chrono::Utc;
use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use worker_core::cursor::AggregationCursor;
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::entities::{Product, ProductMention, ProductVariant, ScoreHistoryEntry, ScoreTrend};
use crate::handlers::aggregation::AggregationOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const PRODUCTS: &str = "products";
const PRODUCT_VARIANTS: &str = "product-variants";
const MENTIONS: &str = "product-mentions";

pub async fn submit(
    client: &CoordinatorClient,
    job: &Job,
    output: HandlerOutput<AggregationOutcome, AggregationCursor>,
) -> anyhow::Result<()> {
    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(gtin = %outcome.gtin, error = %err, "aggregation persist failed");
                    errors += 1;
                }
            },
            Err(_) => errors += 1,
        }
    }

    let scope_exhausted = matches!(&output.next_cursor, AggregationCursor::SelectedGtins { remaining_gtins } if remaining_gtins.is_empty());
    finish(
        client,
        job,
        BatchSummary {
            success_count: success,
            error_count: errors,
            next_cursor: output.next_cursor,
            scope_exhausted,
        },
    )
    .await
}

async fn persist_one(client: &CoordinatorClient, outcome: &AggregationOutcome) -> anyhow::Result<()> {
    let product = find_or_create_product(client, &outcome.gtin).await?;

    let mut source_product_ids = product.source_product_ids.clone();
    for id in &outcome.source_product_ids {
        if !source_product_ids.contains(id) {
            source_product_ids.push(id.clone());
        }
    }

    let mut ingredient_ids = product.ingredient_ids.clone();
    for id in &outcome.matched_ingredient_ids {
        if !ingredient_ids.contains(id) {
            ingredient_ids.push(id.clone());
        }
    }

    let classification = outcome.classification.clone().or_else(|| product.classification.clone());

    let creator_score = average_mention_sentiment(client, &product.id).await?.unwrap_or(0.5);
    let combined = (outcome.store_score + creator_score) / 2.0;
    let trend = match product.score_history.first() {
        Some(previous) => ScoreTrend::classify((previous.store_score + previous.creator_score) / 2.0, combined),
        None => ScoreTrend::Stable,
    };

    let mut score_history = product.score_history.clone();
    score_history.insert(
        0,
        ScoreHistoryEntry {
            store_score: outcome.store_score,
            creator_score,
            trend,
            recorded_at: Utc::now(),
        },
    );

    let update = serde_json::json!({
        "sourceProductIds": source_product_ids,
        "ingredientIds": ingredient_ids,
        "classification": classification,
        "scoreHistory": score_history,
    });
    let _: Product = client.update_by_id(PRODUCTS, &product.id, &update, &[]).await?;
    Ok(())
}

async fn find_or_create_product(client: &CoordinatorClient, gtin: &str) -> anyhow::Result<Product> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("gtin", gtin.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<ProductVariant>(PRODUCT_VARIANTS, &opts).await?;
    if let Some(variant) = existing.docs.into_iter().next() {
        return Ok(client.find_by_id(PRODUCTS, &variant.product_id).await?);
    }

    let product_payload = serde_json::json!({ "gtin": gtin, "sourceProductIds": [] });
    let product: Product = client.create(PRODUCTS, &product_payload, None).await?;

    let variant_payload = serde_json::json!({ "productId": product.id, "gtin": gtin });
    let _: ProductVariant = client.create(PRODUCT_VARIANTS, &variant_payload, None).await?;
    Ok(product)
}

async fn average_mention_sentiment(client: &CoordinatorClient, product_id: &str) -> anyhow::Result<Option<f64>> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("productId", product_id.to_string())),
        limit: Some(500),
        sort: None,
    };
    let mentions = client.find::<ProductMention>(MENTIONS, &opts).await?.docs;
    if mentions.is_empty() {
        return Ok(None);
    }
    let sum: f64 = mentions.iter().map(|m| m.sentiment).sum();
    Ok(Some(sum / mentions.len() as f64))
}
