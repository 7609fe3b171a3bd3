//! Video-discovery handler (spec §4.3/§4.2/§4.4). The channel avatar is
//! refetched every tick (submit always refreshes it, per §4.4).

use crate::batch::{Batch, HandlerOutput, ItemResult};
use crate::builders::video_discovery::VideoDiscoveryItem;
use crate::drivers::{DiscoveredVideo, VideoDiscoveryDriver};
use crate::heartbeat::Heartbeat;
use worker_core::cursor::VideoDiscoveryCursor;

pub struct VideoDiscoveryOutcome {
    pub videos: Vec<DiscoveredVideo>,
    pub avatar_bytes: Vec<u8>,
}

pub async fn handle(
    batch: Batch<VideoDiscoveryItem>,
    driver: &dyn VideoDiscoveryDriver,
    heartbeat: &Heartbeat<'_>,
) -> HandlerOutput<VideoDiscoveryOutcome, VideoDiscoveryCursor> {
    let mut results = Vec::with_capacity(batch.items.len());
    let mut next_cursor = VideoDiscoveryCursor::default();
    let mut exhausted = false;

    for (index, item) in batch.items.into_iter().enumerate() {
        let outcome = match driver
            .list_videos(&item.channel_external_id, item.offset, item.limit)
            .await
        {
            Ok((videos, driver_exhausted)) => {
                exhausted = driver_exhausted;
                next_cursor = VideoDiscoveryCursor {
                    current_offset: item.offset + videos.len() as u64,
                };
                let avatar_bytes = driver
                    .fetch_avatar(&item.channel_external_id)
                    .await
                    .unwrap_or_default();
                Ok(VideoDiscoveryOutcome { videos, avatar_bytes })
            }
            Err(err) => {
                tracing::warn!(channel = %item.channel_external_id, error = %err, "video listing failed");
                next_cursor = VideoDiscoveryCursor { current_offset: item.offset };
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
        next_cursor,
        scope_exhausted: exhausted,
    }
}
