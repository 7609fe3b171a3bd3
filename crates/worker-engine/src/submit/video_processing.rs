//! Video-processing persist (spec §4.4 "Video-processing persist").
//! Re-processing semantics: prior snippets are deleted outright rather than
//! merged, since a re-run reflects a fresh transcript pass.

use coordinator_client::{Compare, CoordinatorClient};
use worker_core::model::Job;

use crate::batch::HandlerOutput;
use crate::entities::{ProductMention, Snippet};
use crate::handlers::video_processing::VideoProcessingOutcome;
use crate::submit::{finish, write_join_records, BatchSummary};

const VIDEOS: &str = "videos";
const SNIPPETS: &str = "snippets";
const MENTIONS: &str = "product-mentions";

pub async fn submit(
    client: &CoordinatorClient,
    job: &Job,
    output: HandlerOutput<VideoProcessingOutcome, ()>,
) -> anyhow::Result<()> {
    write_join_records(client, job.job_type, &job.id, &output.results).await?;

    let mut success = 0u64;
    let mut errors = 0u64;
    for item in &output.results {
        match &item.outcome {
            Ok(outcome) => match persist_one(client, outcome).await {
                Ok(()) => success += 1,
                Err(err) => {
                    tracing::warn!(video_id = %outcome.video_id, error = %err, "video processing persist failed");
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
            next_cursor: (),
            scope_exhausted: false,
        },
    )
    .await
}

async fn persist_one(client: &CoordinatorClient, outcome: &VideoProcessingOutcome) -> anyhow::Result<()> {
    client
        .delete(SNIPPETS, &Compare::equals("videoId", outcome.video_id.clone()))
        .await?;

    for snippet in &outcome.snippets {
        let snippet_payload = serde_json::json!({
            "videoId": outcome.video_id,
            "startSeconds": snippet.start_seconds,
            "endSeconds": snippet.end_seconds,
            "text": snippet.text,
        });
        let created: Snippet = client.create(SNIPPETS, &snippet_payload, None).await?;

        for mention in &snippet.mentions {
            let Some(product_id) = &mention.product_id else {
                continue;
            };
            let mention_payload = serde_json::json!({
                "snippetId": created.id,
                "productId": product_id,
                "sentiment": mention.sentiment,
            });
            let _: ProductMention = client.create(MENTIONS, &mention_payload, None).await?;
        }
    }

    let video_update = serde_json::json!({ "state": "processed" });
    let _: serde_json::Value = client.update_by_id(VIDEOS, &outcome.video_id, &video_update, &[]).await?;
    Ok(())
}
