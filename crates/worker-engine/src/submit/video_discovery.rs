//! Video-discovery persist (spec §4.4 "Video-discovery persist"): creates
//! the creator→channel→video chain, stores thumbnails, and always refreshes
//! the channel avatar (even on a tick that discovers zero new videos).

use coordinator_client::{Compare, CoordinatorClient, FileUpload, FindOptions};
use serde::Deserialize;
use worker_core::cursor::VideoDiscoveryCursor;
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::drivers::DiscoveredVideo;
use crate::entities::{Channel, Creator, Video};
use crate::handlers::video_discovery::VideoDiscoveryOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const CREATORS: &str = "creators";
const CHANNELS: &str = "channels";
const VIDEOS: &str = "videos";
const MEDIA: &str = "media";

#[derive(Debug, Deserialize, Default)]
struct VideoDiscoveryConfig {
    #[serde(rename = "channelExternalId")]
    channel_external_id: String,
}

#[derive(Debug, Deserialize)]
struct MediaDoc {
    url: String,
}

pub async fn submit(
    client: &CoordinatorClient,
    job: &Job,
    output: HandlerOutput<VideoDiscoveryOutcome, VideoDiscoveryCursor>,
) -> anyhow::Result<()> {
    let config: VideoDiscoveryConfig = serde_json::from_value(job.config.clone()).unwrap_or_default();

    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, &config.channel_external_id, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(channel = %config.channel_external_id, error = %err, "video discovery persist failed");
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

async fn persist_one(client: &CoordinatorClient, channel_external_id: &str, outcome: &VideoDiscoveryOutcome) -> anyhow::Result<()> {
    let channel = find_or_create_channel(client, channel_external_id).await?;

    for video in &outcome.videos {
        create_video_if_new(client, &channel.id, video).await?;
    }

    if !outcome.avatar_bytes.is_empty() {
        let avatar_url = store_media(client, "avatar.jpg", &outcome.avatar_bytes).await?;
        let update = serde_json::json!({ "avatarUrl": avatar_url });
        let _: Channel = client.update_by_id(CHANNELS, &channel.id, &update, &[]).await?;
    }

    Ok(())
}

async fn find_or_create_channel(client: &CoordinatorClient, channel_external_id: &str) -> anyhow::Result<Channel> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("externalId", channel_external_id.to_string())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<Channel>(CHANNELS, &opts).await?;
    if let Some(channel) = existing.docs.into_iter().next() {
        return Ok(channel);
    }

    let creator_payload = serde_json::json!({ "name": channel_external_id });
    let creator: Creator = client.create(CREATORS, &creator_payload, None).await?;

    let channel_payload = serde_json::json!({
        "creatorId": creator.id,
        "externalId": channel_external_id,
    });
    Ok(client.create(CHANNELS, &channel_payload, None).await?)
}

async fn create_video_if_new(client: &CoordinatorClient, channel_id: &str, video: &DiscoveredVideo) -> anyhow::Result<()> {
    let opts = FindOptions {
        r#where: Some(Compare::equals("externalId", video.external_id.clone())),
        limit: Some(1),
        sort: None,
    };
    let existing = client.find::<Video>(VIDEOS, &opts).await?;
    if !existing.docs.is_empty() {
        return Ok(());
    }

    let thumbnail_url = match &video.thumbnail_bytes {
        Some(bytes) if !bytes.is_empty() => Some(store_media(client, "thumbnail.jpg", bytes).await?),
        _ => None,
    };

    let payload = serde_json::json!({
        "channelId": channel_id,
        "externalId": video.external_id,
        "url": video.url,
        "state": "unprocessed",
        "thumbnailUrl": thumbnail_url,
    });
    let _: Video = client.create(VIDEOS, &payload, None).await?;
    Ok(())
}

async fn store_media(client: &CoordinatorClient, file_name: &str, bytes: &[u8]) -> anyhow::Result<String> {
    let file = FileUpload {
        field_name: "file".to_string(),
        file_name: file_name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: bytes.to_vec(),
    };
    let doc: MediaDoc = client.create(MEDIA, &serde_json::json!({}), Some(file)).await?;
    Ok(doc.url)
}
