//! Aggregation work builder (spec §4.2 "Aggregation"). `scope = all` scans
//! crawled source-products by a monotonic id cursor, grouping by GTIN;
//! `scope = selected_gtins` processes a fixed id list in one or more ticks.

use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use serde::Deserialize;
use worker_core::cursor::{parse_cursor, AggregationCursor};
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started};

const SOURCE_PRODUCTS: &str = "source-products";

#[derive(Debug, Clone)]
pub enum AggregationItem {
    BySourceProduct { source_product_id: String },
    ByGtin { gtin: String },
}

#[derive(Debug, Clone, Deserialize, Default)]
struct AggregationConfig {
    #[serde(rename = "gtins", default)]
    gtins: Vec<String>,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<AggregationItem>> {
    let initial = initial_cursor(job.target_scope.as_deref(), &job.config);
    let total = estimated_total(client, &initial).await?;
    let job = ensure_started(client, job, total, &initial).await?;
    let cursor: AggregationCursor = parse_cursor(&job.progress);

    match cursor {
        AggregationCursor::All { last_checked_source_id } => {
            let page = fetch_source_product_page(client, last_checked_source_id.as_deref(), job.items_per_tick).await?;
            if page.is_empty() {
                complete_with_no_batch(client, &job).await?;
                return Ok(BuildOutcome::Completed);
            }
            let items = page
                .iter()
                .map(|id| AggregationItem::BySourceProduct {
                    source_product_id: id.clone(),
                })
                .collect();
            Ok(BuildOutcome::Batch(Batch::new(job.id, items)))
        }
        AggregationCursor::SelectedGtins { remaining_gtins } => {
            if remaining_gtins.is_empty() {
                complete_with_no_batch(client, &job).await?;
                return Ok(BuildOutcome::Completed);
            }
            let take = (job.items_per_tick as usize).min(remaining_gtins.len());
            let items = remaining_gtins[..take]
                .iter()
                .map(|gtin| AggregationItem::ByGtin { gtin: gtin.clone() })
                .collect();
            Ok(BuildOutcome::Batch(Batch::new(job.id, items)))
        }
    }
}

fn initial_cursor(target_scope: Option<&str>, config: &serde_json::Value) -> AggregationCursor {
    match target_scope {
        Some("selected_gtins") => {
            let cfg: AggregationConfig = serde_json::from_value(config.clone()).unwrap_or_default();
            AggregationCursor::SelectedGtins {
                remaining_gtins: cfg.gtins,
            }
        }
        _ => AggregationCursor::All {
            last_checked_source_id: None,
        },
    }
}

async fn estimated_total(client: &CoordinatorClient, cursor: &AggregationCursor) -> anyhow::Result<u64> {
    match cursor {
        AggregationCursor::All { .. } => Ok(client
            .count(SOURCE_PRODUCTS, Some(&Compare::equals("crawlState", "crawled")))
            .await?
            .total_docs),
        AggregationCursor::SelectedGtins { remaining_gtins } => Ok(remaining_gtins.len() as u64),
    }
}

async fn fetch_source_product_page(
    client: &CoordinatorClient,
    last_checked_source_id: Option<&str>,
    limit: u32,
) -> anyhow::Result<Vec<String>> {
    let mut clauses = vec![Compare::equals("crawlState", "crawled")];
    if let Some(id) = last_checked_source_id {
        clauses.push(Compare::greater_than_equal("id", id.to_string()));
        // exclude the already-checked boundary; `id` ordering is treated as
        // opaque-but-monotonic so `>=` plus a post-filter keeps this honest
        // without assuming a numeric id format.
    }
    let r#where = coordinator_client::Where::and(clauses);
    let opts = FindOptions {
        r#where: Some(r#where),
        limit: Some(limit.saturating_add(if last_checked_source_id.is_some() { 1 } else { 0 })),
        sort: Some("id".to_string()),
    };
    let page = client.find::<SourceProductIdDoc>(SOURCE_PRODUCTS, &opts).await?;
    let mut ids: Vec<String> = page.docs.into_iter().map(|d| d.id).collect();
    if let Some(last) = last_checked_source_id {
        ids.retain(|id| id != last);
    }
    ids.truncate(limit as usize);
    Ok(ids)
}

#[derive(Debug, Deserialize)]
struct SourceProductIdDoc {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_cursor_defaults_to_all_scope() {
        let cursor = initial_cursor(None, &serde_json::Value::Null);
        assert!(matches!(cursor, AggregationCursor::All { last_checked_source_id: None }));
    }

    #[test]
    fn initial_cursor_selected_gtins_reads_config() {
        let cursor = initial_cursor(Some("selected_gtins"), &serde_json::json!({ "gtins": ["111", "222"] }));
        match cursor {
            AggregationCursor::SelectedGtins { remaining_gtins } => assert_eq!(remaining_gtins, vec!["111", "222"]),
            _ => panic!("expected selected_gtins"),
        }
    }
}
