//! Aggregation handler (spec §4.3/§4.4). No external driver backs this job
//! type — everything it needs is already durable state behind the
//! coordinator, so the handler's job is read-and-group rather than
//! read-from-a-collaborator. Product/score-history writes (the part that
//! actually needs the *current* state of a possibly-existing product) are
//! deferred to submit, which reads immediately before writing.

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::aggregation::AggregationItem;
use crate::entities::SourceProduct;
use crate::heartbeat::Heartbeat;
use coordinator_client::{Compare, CoordinatorClient, FindOptions, Where};
use worker_core::cursor::AggregationCursor;

const SOURCE_PRODUCTS: &str = "source-products";
const INGREDIENTS: &str = "ingredients";

pub struct AggregationOutcome {
    pub gtin: String,
    pub source_product_ids: Vec<String>,
    pub ingredients_text: Option<String>,
    pub matched_ingredient_ids: Vec<String>,
    pub classification: Option<String>,
    /// Heuristic confidence signal: how many independent sources corroborate
    /// this GTIN, saturating at 1.0 around five sources.
    pub store_score: f64,
}

/// `cursor` is the job's cursor as it stood when this batch was built — the
/// same one `builders::aggregation::build` sliced `batch`'s items from.
/// Advancing it here (rather than leaving it to submit) keeps the "how far
/// did this batch get" logic next to the items that answer it.
pub async fn handle(
    batch: Batch<AggregationItem>,
    client: &CoordinatorClient,
    heartbeat: &Heartbeat<'_>,
    cursor: AggregationCursor,
) -> HandlerOutput<AggregationOutcome, AggregationCursor> {
    let processed = batch.items.len();
    let mut results = Vec::with_capacity(processed);
    let mut last_source_product_id = match &cursor {
        AggregationCursor::All { last_checked_source_id } => last_checked_source_id.clone(),
        AggregationCursor::SelectedGtins { .. } => None,
    };

    for (index, item) in batch.items.into_iter().enumerate() {
        if let AggregationItem::BySourceProduct { source_product_id } = &item {
            last_source_product_id = Some(source_product_id.clone());
        }
        let outcome = aggregate(client, &item).await;
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "aggregation grouping failed");
        }
        results.push(ItemResult {
            input_index: index,
            outcome: outcome.map_err(|err| format!("{err:#}")),
        });
        heartbeat.beat().await;
    }

    let next_cursor = match cursor {
        AggregationCursor::All { .. } => AggregationCursor::All {
            last_checked_source_id: last_source_product_id,
        },
        AggregationCursor::SelectedGtins { remaining_gtins } => AggregationCursor::SelectedGtins {
            remaining_gtins: remaining_gtins.into_iter().skip(processed).collect(),
        },
    };

    HandlerOutput {
        results,
        next_cursor,
        scope_exhausted: false,
    }
}

async fn aggregate(client: &CoordinatorClient, item: &AggregationItem) -> anyhow::Result<AggregationOutcome> {
    let gtin = match item {
        AggregationItem::ByGtin { gtin } => gtin.clone(),
        AggregationItem::BySourceProduct { source_product_id } => {
            let source: SourceProduct = client.find_by_id(SOURCE_PRODUCTS, source_product_id).await?;
            source
                .gtin
                .ok_or_else(|| anyhow::anyhow!("source product {source_product_id} has no gtin"))?
        }
    };

    let members = fetch_by_gtin(client, &gtin).await?;
    let ingredients_text = members.iter().find_map(|p| p.ingredients_text.clone());
    let matched_ingredient_ids = match &ingredients_text {
        Some(text) => match_ingredients(client, text).await.unwrap_or_default(),
        None => Vec::new(),
    };
    let classification = majority_category(client, &matched_ingredient_ids).await.unwrap_or(None);
    let store_score = (members.len() as f64 / 5.0).min(1.0);

    Ok(AggregationOutcome {
        gtin,
        source_product_ids: members.into_iter().map(|p| p.id).collect(),
        ingredients_text,
        matched_ingredient_ids,
        classification,
        store_score,
    })
}

async fn fetch_by_gtin(client: &CoordinatorClient, gtin: &str) -> anyhow::Result<Vec<SourceProduct>> {
    let opts = FindOptions {
        r#where: Some(Where::and([
            Compare::equals("gtin", gtin.to_string()),
            Compare::equals("crawlState", "crawled"),
        ])),
        limit: Some(500),
        sort: None,
    };
    Ok(client.find::<SourceProduct>(SOURCE_PRODUCTS, &opts).await?.docs)
}

async fn match_ingredients(client: &CoordinatorClient, ingredients_text: &str) -> anyhow::Result<Vec<String>> {
    let haystack = ingredients_text.to_lowercase();
    let opts = FindOptions {
        r#where: None,
        limit: Some(1000),
        sort: None,
    };
    let all = client
        .find::<crate::entities::Ingredient>(INGREDIENTS, &opts)
        .await?
        .docs;
    Ok(all
        .into_iter()
        .filter(|ingredient| haystack.contains(&ingredient.name.to_lowercase()))
        .map(|ingredient| ingredient.id)
        .collect())
}

async fn majority_category(client: &CoordinatorClient, ingredient_ids: &[String]) -> anyhow::Result<Option<String>> {
    if ingredient_ids.is_empty() {
        return Ok(None);
    }
    let opts = FindOptions {
        r#where: Some(Compare::in_set("id", ingredient_ids.to_vec())),
        limit: Some(ingredient_ids.len() as u32),
        sort: None,
    };
    let matched = client
        .find::<crate::entities::Ingredient>(INGREDIENTS, &opts)
        .await?
        .docs;
    let mut counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    for ingredient in matched.into_iter().filter_map(|i| i.category) {
        *counts.entry(ingredient).or_insert(0) += 1;
    }
    Ok(counts.into_iter().max_by_key(|(_, count)| *count).map(|(category, _)| category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_score_saturates_at_one() {
        let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let score = (ids.len() as f64 / 5.0).min(1.0);
        assert_eq!(score, 1.0);
    }
}
