//! Crawl work builder (spec §4.2 "Crawl"). No explicit cursor: the implicit
//! work queue is "variants whose parent is uncrawled and whose own
//! `crawledAt` is null", filtered by scope.

use coordinator_client::{Compare, CoordinatorClient, FindOptions, Where};
use worker_core::cursor::{parse_cursor, CrawlScope};
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started};

const VARIANTS: &str = "source-variants";

#[derive(Debug, Clone)]
pub struct CrawlItem {
    pub variant_id: String,
    pub parent_id: String,
    pub url: String,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<CrawlItem>> {
    let scope: CrawlScope = parse_cursor(&job.progress);

    let job = if job.is_pending() {
        if let CrawlScope::Recrawl { min_crawl_age_seconds } = &scope {
            reset_for_recrawl(client, *min_crawl_age_seconds).await?;
        }
        let total = count_uncrawled(client, &scope).await?;
        ensure_started(client, job, total, &scope).await?
    } else {
        job
    };

    let page = fetch_uncrawled_page(client, &scope, job.items_per_tick).await?;
    if page.is_empty() {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    }

    Ok(BuildOutcome::Batch(Batch::new(job.id, page)))
}

async fn reset_for_recrawl(client: &CoordinatorClient, min_crawl_age_seconds: Option<u64>) -> anyhow::Result<()> {
    let mut parent_where = vec![Compare::equals("crawlState", "crawled")];
    if let Some(min_age) = min_crawl_age_seconds {
        let cutoff = chrono::Utc::now() - chrono::Duration::seconds(min_age as i64);
        parent_where.push(Compare::less_than("lastCrawledAt", cutoff.to_rfc3339()));
    }
    let reset_parents = serde_json::json!({ "crawlState": "uncrawled" });
    let _: serde_json::Value = client
        .update_by_where("source-products", &Where::and(parent_where), &reset_parents)
        .await?;

    let reset_children = serde_json::json!({ "crawledAt": null });
    let _: serde_json::Value = client
        .update_by_where(VARIANTS, &Compare::exists("crawledAt", true), &reset_children)
        .await?;
    Ok(())
}

fn scope_where(scope: &CrawlScope) -> Where {
    let base = Compare::exists("crawledAt", false);
    match scope {
        CrawlScope::All | CrawlScope::Recrawl { .. } => base,
        CrawlScope::SelectedUrls { urls } => Where::and([base, Compare::in_set("url", urls.clone())]),
        CrawlScope::SelectedGtins { gtins } => Where::and([base, Compare::in_set("gtin", gtins.clone())]),
        CrawlScope::FromDiscovery => Where::and([base, Compare::equals("fromDiscovery", true)]),
    }
}

async fn count_uncrawled(client: &CoordinatorClient, scope: &CrawlScope) -> anyhow::Result<u64> {
    Ok(client.count(VARIANTS, Some(&scope_where(scope))).await?.total_docs)
}

async fn fetch_uncrawled_page(client: &CoordinatorClient, scope: &CrawlScope, limit: u32) -> anyhow::Result<Vec<CrawlItem>> {
    let opts = FindOptions {
        r#where: Some(scope_where(scope)),
        limit: Some(limit),
        sort: None,
    };
    let page = client.find::<VariantDoc>(VARIANTS, &opts).await?;
    Ok(page
        .docs
        .into_iter()
        .map(|v| CrawlItem {
            variant_id: v.id,
            parent_id: v.parent_id,
            url: v.url,
        })
        .collect())
}

#[derive(Debug, serde::Deserialize)]
struct VariantDoc {
    id: String,
    #[serde(rename = "parentId")]
    parent_id: String,
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_where_narrows_by_selected_urls() {
        let scope = CrawlScope::SelectedUrls {
            urls: vec!["https://a".to_string()],
        };
        let pairs = scope_where(&scope).to_query_pairs();
        assert!(pairs.iter().any(|(k, _)| k.contains("[url][in]")));
    }

    #[test]
    fn scope_where_all_only_filters_uncrawled() {
        let pairs = scope_where(&CrawlScope::All).to_query_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].0.contains("[crawledAt][exists]"));
    }
}
