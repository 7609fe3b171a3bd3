//! Dispatch: claim → build → handle → submit for one job type (spec §4.1–
//! §4.4 wired end to end). `run_once` is what the main loop calls each tick.

use std::time::Duration;

use coordinator_client::CoordinatorClient;
use worker_core::model::{Job, JobType};

use crate::batch::BuildOutcome;
use crate::builders;
use crate::claim::ClaimEngine;
use crate::drivers::{CrawlDriver, DiscoveryDriver, IngredientDriver, VideoDiscoveryDriver, VideoProcessingDriver};
use crate::handlers;
use crate::heartbeat::{Heartbeat, Watchdog};
use crate::submit;

/// The five out-of-scope external collaborators, one per driver-backed job
/// type (aggregation has none — see `handlers::aggregation`).
pub struct Drivers<'a> {
    pub crawl: &'a dyn CrawlDriver,
    pub discovery: &'a dyn DiscoveryDriver,
    pub ingredient: &'a dyn IngredientDriver,
    pub video_discovery: &'a dyn VideoDiscoveryDriver,
    pub video_processing: &'a dyn VideoProcessingDriver,
}

/// Outcome of one claim attempt, reported to the main loop for logging.
pub enum TickOutcome {
    NoWork,
    Dispatched { job_type: JobType, job_id: String },
}

/// Claim one job across `capabilities` and, if one was claimed, run it
/// through build → handle → submit (spec §4.6 steps 2-3).
pub async fn run_once(
    client: &CoordinatorClient,
    worker_id: &str,
    capabilities: &[JobType],
    job_timeout: Duration,
    drivers: &Drivers<'_>,
) -> anyhow::Result<TickOutcome> {
    let claim_engine = ClaimEngine::new(client);
    let Some(job) = claim_engine.claim(worker_id, capabilities, job_timeout).await? else {
        return Ok(TickOutcome::NoWork);
    };

    let job_type = job.job_type;
    let job_id = job.id.clone();
    dispatch(client, job, worker_id, job_timeout, drivers).await?;
    Ok(TickOutcome::Dispatched { job_type, job_id })
}

async fn dispatch(
    client: &CoordinatorClient,
    job: Job,
    worker_id: &str,
    job_timeout: Duration,
    drivers: &Drivers<'_>,
) -> anyhow::Result<()> {
    let job_type = job.job_type;
    let watchdog = Watchdog::new(job_timeout);

    match job_type {
        JobType::Crawl => {
            let outcome = builders::crawl::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::crawl::handle(batch, drivers.crawl, &heartbeat, &watchdog).await;
            submit::crawl::submit(client, &current, output).await
        }
        JobType::Discovery => {
            let outcome = builders::discovery::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::discovery::handle(batch, drivers.discovery, &heartbeat).await;
            submit::discovery::submit(client, &current, output).await
        }
        JobType::IngredientDiscovery => {
            let outcome = builders::ingredient_discovery::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::ingredient_discovery::handle(batch, drivers.ingredient, &heartbeat).await;
            submit::ingredient_discovery::submit(client, &current, output).await
        }
        JobType::VideoDiscovery => {
            let outcome = builders::video_discovery::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::video_discovery::handle(batch, drivers.video_discovery, &heartbeat).await;
            submit::video_discovery::submit(client, &current, output).await
        }
        JobType::VideoProcessing => {
            let outcome = builders::video_processing::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::video_processing::handle(batch, drivers.video_processing, client, &heartbeat).await;
            submit::video_processing::submit(client, &current, output).await
        }
        JobType::Aggregation => {
            let outcome = builders::aggregation::build(client, job).await?;
            let BuildOutcome::Batch(batch) = outcome else { return Ok(()) };
            let current = refetch(client, job_type, &batch.job_id).await?;
            let cursor = worker_core::cursor::parse_cursor(&current.progress);
            let heartbeat = Heartbeat::new(client, worker_id, job_type, batch.job_id.clone());
            let output = handlers::aggregation::handle(batch, client, &heartbeat, cursor).await;
            submit::aggregation::submit(client, &current, output).await
        }
    }
}

/// Builders mutate the remote job record (counters, cursor, status) via
/// `ensure_started` but only return the batch, so submit re-reads the
/// authoritative record rather than working off the pre-build snapshot.
async fn refetch(client: &CoordinatorClient, job_type: JobType, job_id: &str) -> anyhow::Result<Job> {
    Ok(client.find_by_id(job_type.collection(), job_id).await?)
}
