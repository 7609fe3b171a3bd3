//! Main loop (spec §4.6). Authenticates once, then loops claim → dispatch
//! forever, sleeping `PollInterval` on both "no work" and any error.

use std::time::Duration;

use coordinator_client::event::{EventKind, EventSink};
use coordinator_client::CoordinatorClient;
use worker_core::model::{JobType, Worker, WorkerStatus};

use crate::dispatch::{run_once, Drivers, TickOutcome};

/// Worker-fatal: surfaced to `main`, which exits non-zero (spec §7
/// "Worker-fatal ... process exits non-zero").
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("authentication failed: {0}")]
    Auth(#[from] coordinator_client::Error),
    #[error("no worker record returned for this API key")]
    NoSuchWorker,
    #[error("worker is disabled")]
    Disabled,
}

/// `GET /me`, rejecting a worker that isn't `active` (spec §4.6 "reject if
/// the worker is not active").
pub async fn authenticate(client: &CoordinatorClient) -> Result<Worker, StartupError> {
    let response = client.me::<Worker>().await?;
    let worker = response.user.ok_or(StartupError::NoSuchWorker)?;
    if worker.status != WorkerStatus::Active {
        return Err(StartupError::Disabled);
    }
    Ok(worker)
}

/// Run the claim/dispatch loop forever. `should_stop` is polled once per
/// iteration so the binary can wire in graceful shutdown on a signal.
pub async fn run(
    client: &CoordinatorClient,
    worker: &Worker,
    capabilities: &[JobType],
    job_timeout: Duration,
    poll_interval: Duration,
    drivers: &Drivers<'_>,
    mut should_stop: impl FnMut() -> bool,
) {
    let events = EventSink::new(client, "worker-engine");
    let _ = events
        .record(EventKind::Start, "info", &format!("worker {} starting", worker.id), None)
        .await;

    while !should_stop() {
        refresh_last_seen(client, &worker.id).await;

        match run_once(client, &worker.id, capabilities, job_timeout, drivers).await {
            Ok(TickOutcome::NoWork) => {
                tokio::time::sleep(poll_interval).await;
            }
            Ok(TickOutcome::Dispatched { job_type, job_id }) => {
                tracing::info!(job_type = ?job_type, job_id = %job_id, "tick dispatched");
            }
            Err(err) => {
                tracing::warn!(error = %err, "main loop tick failed, will retry after poll interval");
                let _ = events
                    .record(EventKind::Warning, "warn", &format!("tick failed: {err:#}"), None)
                    .await;
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

/// Refresh `worker.lastSeenAt` independent of any job's own heartbeat (spec
/// §4.6 step 1), so a worker polling through empty-claim ticks still shows
/// as alive. Best-effort, same as `Heartbeat::beat`'s worker-liveness write.
async fn refresh_last_seen(client: &CoordinatorClient, worker_id: &str) {
    let update = serde_json::json!({ "lastSeenAt": chrono::Utc::now() });
    if let Err(err) = client
        .update_by_id::<serde_json::Value, _>("workers", worker_id, &update, &[])
        .await
    {
        tracing::warn!(worker_id = %worker_id, error = %err, "failed to refresh worker liveness");
    }
}
