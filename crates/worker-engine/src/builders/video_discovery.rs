//! Video-discovery work builder (spec §4.2 "Video-discovery"). Cursor is a
//! 0-based, channel-relative `currentOffset`; each tick fetches videos
//! `[offset, offset + itemsPerTick)`.

use coordinator_client::CoordinatorClient;
use serde::Deserialize;
use worker_core::cursor::{parse_cursor, VideoDiscoveryCursor};
use worker_core::model::Job;

use crate::batch::{Batch, BuildOutcome};
use crate::builders::{complete_with_no_batch, ensure_started};

#[derive(Debug, Clone, Deserialize, Default)]
struct VideoDiscoveryConfig {
    #[serde(rename = "channelExternalId")]
    channel_external_id: String,
    #[serde(rename = "maxVideos", default)]
    max_videos: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct VideoDiscoveryItem {
    pub channel_external_id: String,
    pub offset: u64,
    pub limit: u32,
}

pub async fn build(client: &CoordinatorClient, job: Job) -> anyhow::Result<BuildOutcome<VideoDiscoveryItem>> {
    let config: VideoDiscoveryConfig = serde_json::from_value(job.config.clone())?;
    let initial = VideoDiscoveryCursor::default();

    let job = ensure_started(client, job, config.max_videos.unwrap_or(0), &initial).await?;
    let cursor: VideoDiscoveryCursor = parse_cursor(&job.progress);

    if cursor.is_complete(config.max_videos, false) {
        complete_with_no_batch(client, &job).await?;
        return Ok(BuildOutcome::Completed);
    }

    Ok(BuildOutcome::Batch(Batch::new(
        job.id,
        vec![VideoDiscoveryItem {
            channel_external_id: config.channel_external_id,
            offset: cursor.current_offset,
            limit: job.items_per_tick,
        }],
    )))
}
