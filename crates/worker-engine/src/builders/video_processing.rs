//! Video-processing work builder (spec §4.2 "Video-processing"). No
//! cursor: the queue is re-derived every tick from the `videos` entity
//! filtered to `unprocessed`.

use coordinator_client::{Compare, CoordinatorClient, FindOptions};
use serde::Deserialize;
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started};

const VIDEOS: &str = "videos";

#[derive(Debug, Clone)]
pub struct VideoProcessingItem {
    pub video_id: String,
    pub url: String,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<VideoProcessingItem>> {
    let total = client
        .count(VIDEOS, Some(&Compare::equals("state", "unprocessed")))
        .await?
        .total_docs;
    let job = ensure_started(client, job, total, &serde_json::Value::Null).await?;

    let opts = FindOptions {
        r#where: Some(Compare::equals("state", "unprocessed")),
        limit: Some(job.items_per_tick),
        sort: None,
    };
    let page = client.find::<VideoDoc>(VIDEOS, &opts).await?;

    if page.docs.is_empty() {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    }

    let items = page
        .docs
        .into_iter()
        .map(|v| VideoProcessingItem {
            video_id: v.id,
            url: v.url,
        })
        .collect();

    Ok(BuildOutcome::Batch(Batch::new(job.id, items)))
}

#[derive(Debug, Deserialize)]
struct VideoDoc {
    id: String,
    url: String,
}
