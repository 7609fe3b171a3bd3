//! Work builders (spec §4.2): turn a claimed job into a typed [`crate::batch::Batch`]
//! or a completed job. Each job type gets its own module; this file holds the
//! "common contract" shared by all six.

pub mod aggregation;
pub mod crawl;
pub mod discovery;
pub mod ingredient_discovery;
pub mod video_discovery;
pub mod video_processing;

use chrono::Utc;
use coordinator_client::event::{EventKind, EventSink, JobRef};
use coordinator_client::CoordinatorClient;
use serde::Serialize;
use worker_core::model::{Job, JobType};

use crate::submit::job_type_ref_kind;

/// If `job` is still `pending`, transition it to `in_progress`: set
/// `startedAt`, zero the counters, write the initial cursor, and return the
/// updated record. A no-op (returns `job` unchanged) for any other status
/// (spec §4.2 "Common contract").
///
/// Rejects `itemsPerTick = 0` outright (spec §7 "Job-fatal: invariant
/// violation") — a zero batch size can never make progress, so letting it
/// through would stall the job forever instead of failing it visibly.
pub async fn ensure_started<C: Serialize>(
    client: &CoordinatorClient,
    job: Job,
    total: u64,
    initial_cursor: &C,
) -> anyhow::Result<Job> {
    if job.items_per_tick == 0 {
        fail_job(client, &job, "itemsPerTick must be greater than zero").await?;
        anyhow::bail!("job {} has itemsPerTick = 0, marked failed", job.id);
    }
    if !job.is_pending() {
        return Ok(job);
    }
    let update = serde_json::json!({
        "status": "in_progress",
        "startedAt": Utc::now(),
        "total": total,
        "progressed": 0,
        "errors": 0,
        "progress": initial_cursor,
    });
    let updated = client
        .update_by_id::<Job, _>(job.job_type.collection(), &job.id, &update, &[])
        .await?;
    tracing::info!(job_id = %updated.id, job_type = ?updated.job_type, total, "job started");

    let sink = EventSink::new(client, "worker-engine");
    let _ = sink
        .record(
            EventKind::Start,
            "info",
            &format!("{:?} job {} started ({total} items)", updated.job_type, updated.id),
            Some(job_ref(updated.job_type, &updated.id)),
        )
        .await;

    Ok(updated)
}

/// Mark a job `completed` with no batch to dispatch this tick (spec §4.2:
/// "transition the job to completed ... and return no work").
pub async fn complete_with_no_batch(client: &CoordinatorClient, job: &Job) -> anyhow::Result<()> {
    let update = serde_json::json!({
        "status": "completed",
        "completedAt": Utc::now(),
        "claimedBy": null,
        "claimedAt": null,
    });
    let _: Job = client
        .update_by_id(job.job_type.collection(), &job.id, &update, &[])
        .await?;
    tracing::info!(job_id = %job.id, job_type = ?job.job_type, "job completed (empty slice)");

    let sink = EventSink::new(client, "worker-engine");
    let _ = sink
        .record(
            EventKind::Success,
            "info",
            &format!("{:?} job {} completed (no remaining work)", job.job_type, job.id),
            Some(job_ref(job.job_type, &job.id)),
        )
        .await;

    Ok(())
}

/// Transition a job to `failed` (spec §7 "Job-fatal: invariant violation,
/// impossible cursor"). Terminal and never reclaimed — the claim engine
/// only ever polls for `pending`/`in_progress`.
pub async fn fail_job(client: &CoordinatorClient, job: &Job, reason: &str) -> anyhow::Result<()> {
    let update = serde_json::json!({
        "status": "failed",
        "completedAt": Utc::now(),
        "claimedBy": null,
        "claimedAt": null,
    });
    let _: Job = client
        .update_by_id(job.job_type.collection(), &job.id, &update, &[])
        .await?;
    tracing::error!(job_id = %job.id, job_type = ?job.job_type, reason, "job failed");

    let sink = EventSink::new(client, "worker-engine");
    let _ = sink
        .record(
            EventKind::Error,
            "error",
            &format!("{:?} job {} failed: {reason}", job.job_type, job.id),
            Some(job_ref(job.job_type, &job.id)),
        )
        .await;

    Ok(())
}

fn job_ref(job_type: JobType, job_id: &str) -> JobRef {
    JobRef {
        kind: job_type_ref_kind(job_type).to_string(),
        id: job_id.to_string(),
    }
}

pub(crate) fn job_type_label(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Crawl => "crawl",
        JobType::Discovery => "discovery",
        JobType::IngredientDiscovery => "ingredient-discovery",
        JobType::VideoDiscovery => "video-discovery",
        JobType::VideoProcessing => "video-processing",
        JobType::Aggregation => "aggregation",
    }
}
