//! Discovery work builder (spec §4.2 "Discovery"). Cursor is
//! `{currentUrlIndex, driverProgress}`; completion is `currentUrlIndex >= |sourceUrls|`.

use coordinator_client::CoordinatorClient;
use serde::Deserialize;
use worker_core::cursor::{parse_cursor, DiscoveryCursor};
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started};

#[derive(Debug, Clone, Deserialize, Default)]
struct DiscoveryConfig {
    #[serde(rename = "sourceUrls", default)]
    source_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoveryItem {
    pub source_url: String,
    pub cursor: DiscoveryCursor,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<DiscoveryItem>> {
    let config: DiscoveryConfig = serde_json::from_value(job.config.clone()).unwrap_or_default();
    let initial = DiscoveryCursor::default();

    let job = ensure_started(client, job, config.source_urls.len() as u64, &initial).await?;
    let cursor: DiscoveryCursor = parse_cursor(&job.progress);

    if cursor.is_complete(config.source_urls.len()) {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    }

    let Some(source_url) = config.source_urls.get(cursor.current_url_index).cloned() else {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    };

    Ok(BuildOutcome::Batch(Batch::new(
        job.id,
        vec![DiscoveryItem { source_url, cursor }],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_source_urls() {
        let config: DiscoveryConfig =
            serde_json::from_value(serde_json::json!({ "sourceUrls": ["https://a", "https://b"] })).unwrap();
        assert_eq!(config.source_urls.len(), 2);
    }
}
