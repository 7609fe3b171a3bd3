//! Submit / persist (spec §4.4): write entity changes, write per-item join
//! records, bump counters, decide completion, release or complete the lease.
//! Each job type gets its own module with its own merge rule; this file
//! holds the "counters and completion" contract shared by all six.

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

use crate::batch::ItemResult;

/// The outcome of one batch's persist pass, independent of what the
/// per-type payload looked like: how many items succeeded/failed, the
/// cursor to resume from, and whether the builder's scope is exhausted.
pub struct BatchSummary<C> {
    pub success_count: u64,
    pub error_count: u64,
    pub next_cursor: C,
    pub scope_exhausted: bool,
}

/// Apply counters-and-completion (spec §4.4 "Counters and completion") and
/// either complete the job or release the claim with the new cursor.
pub async fn finish<C: Serialize>(
    client: &CoordinatorClient,
    job: &Job,
    summary: BatchSummary<C>,
) -> anyhow::Result<()> {
    let progressed = job.progressed + summary.success_count;
    let errors = job.errors + summary.error_count;
    let done = is_done(progressed, errors, job.total, summary.scope_exhausted);

    let update = if done {
        serde_json::json!({
            "status": "completed",
            "completedAt": Utc::now(),
            "progressed": progressed,
            "errors": errors,
            "claimedBy": null,
            "claimedAt": null,
        })
    } else {
        serde_json::json!({
            "progressed": progressed,
            "errors": errors,
            "claimedBy": null,
            "claimedAt": null,
            "progress": summary.next_cursor,
        })
    };

    let _: Job = client
        .update_by_id(job.job_type.collection(), &job.id, &update, &[])
        .await?;

    if done {
        tracing::info!(job_id = %job.id, job_type = ?job.job_type, progressed, errors, "job completed");
        let sink = EventSink::new(client, "worker-engine");
        let message = format!("{:?} job {} completed ({progressed} ok, {errors} errors)", job.job_type, job.id);
        let _ = sink
            .record(
                EventKind::Success,
                "info",
                &message,
                Some(JobRef {
                    kind: job_type_ref_kind(job.job_type).to_string(),
                    id: job.id.clone(),
                }),
            )
            .await;
    } else {
        tracing::info!(job_id = %job.id, job_type = ?job.job_type, progressed, errors, "job released for next tick");
    }

    Ok(())
}

/// A job is done when every item has been accounted for (success or error)
/// or the builder says its scope is exhausted (spec §4.4 "Counters and
/// completion") — whichever comes first, since a builder can run dry before
/// `total` is even known (e.g. an unbounded discovery crawl).
fn is_done(progressed: u64, errors: u64, total: u64, scope_exhausted: bool) -> bool {
    progressed + errors >= total || scope_exhausted
}

pub(crate) fn job_type_ref_kind(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Crawl => "crawl_job",
        JobType::Discovery => "discovery_job",
        JobType::IngredientDiscovery => "ingredient_discovery_job",
        JobType::VideoDiscovery => "video_discovery_job",
        JobType::VideoProcessing => "video_processing_job",
        JobType::Aggregation => "aggregation_job",
    }
}

#[derive(Serialize)]
struct JoinRecord<'a, T: Serialize> {
    #[serde(rename = "jobId")]
    job_id: &'a str,
    #[serde(rename = "inputIndex")]
    input_index: usize,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Write one per-item join record (spec §4.4: "write per-item join
/// records") to the job type's results collection, independent of whether
/// the item's persist succeeded.
pub async fn write_join_records<T: Serialize>(
    client: &CoordinatorClient,
    job_type: JobType,
    job_id: &str,
    results: &[ItemResult<T>],
) -> anyhow::Result<()> {
    for item in results {
        let (result, error) = match &item.outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err.as_str())),
        };
        let record = JoinRecord {
            job_id,
            input_index: item.input_index,
            ok: result.is_some(),
            result,
            error,
        };
        let _: serde_json::Value = client.create(job_type.results_collection(), &record, None).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_when_all_items_accounted_for() {
        assert!(is_done(8, 2, 10, false));
        assert!(!is_done(7, 2, 10, false));
    }

    #[test]
    fn done_when_scope_exhausted_even_if_total_not_reached() {
        assert!(is_done(3, 0, 10, true));
    }

    #[test]
    fn job_type_ref_kind_covers_every_variant() {
        for job_type in [
            JobType::Crawl,
            JobType::Discovery,
            JobType::IngredientDiscovery,
            JobType::VideoDiscovery,
            JobType::VideoProcessing,
            JobType::Aggregation,
        ] {
            assert!(job_type_ref_kind(job_type).ends_with("_job"));
        }
    }
}
