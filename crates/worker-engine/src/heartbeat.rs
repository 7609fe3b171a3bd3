//! Lease extension as a side channel (spec §4.5). Grounded on the teacher's
//! retry loops in `client-engine/src/worker.rs` for the "log and keep going"
//! shape, but heartbeat failures are never retried — they are best-effort by
//! contract.

use std::time::Duration;

use chrono::Utc;
use coordinator_client::CoordinatorClient;
use worker_core::model::JobType;

/// `heartbeat(jobId, ...)` (spec §4.5): two best-effort writes, never fatal.
/// Only refreshes `claimedAt`/`lastSeenAt`; never touches `status` or
/// `claimedBy`.
pub struct Heartbeat<'a> {
    client: &'a CoordinatorClient,
    worker_id: String,
    job_type: JobType,
    job_id: String,
}

impl<'a> Heartbeat<'a> {
    pub fn new(client: &'a CoordinatorClient, worker_id: impl Into<String>, job_type: JobType, job_id: impl Into<String>) -> Self {
        Self {
            client,
            worker_id: worker_id.into(),
            job_type,
            job_id: job_id.into(),
        }
    }

    pub async fn beat(&self) {
        let now = Utc::now();

        let job_update = serde_json::json!({ "claimedAt": now });
        if let Err(err) = self
            .client
            .update_by_id::<serde_json::Value, _>(self.job_type.collection(), &self.job_id, &job_update, &[])
            .await
        {
            tracing::warn!(job_id = %self.job_id, error = %err, "heartbeat: job lease refresh failed");
        }

        let worker_update = serde_json::json!({ "lastSeenAt": now });
        if let Err(err) = self
            .client
            .update_by_id::<serde_json::Value, _>("workers", &self.worker_id, &worker_update, &[])
            .await
        {
            tracing::warn!(worker_id = %self.worker_id, error = %err, "heartbeat: worker liveness refresh failed");
        }
    }
}

/// Logs a warning when a single item's processing time exceeds
/// `JobTimeout / 4` (§9 "Backpressure on long batches"). Not a hard limit —
/// `itemsPerTick` is the only real backpressure knob; this is a visibility
/// aid for operators tuning it.
pub struct Watchdog {
    threshold: Duration,
}

impl Watchdog {
    pub fn new(job_timeout: Duration) -> Self {
        Self {
            threshold: worker_core::constants::watchdog_threshold(job_timeout),
        }
    }

    pub fn check(&self, item_label: &str, elapsed: Duration) {
        if elapsed >= self.threshold {
            tracing::warn!(
                item = item_label,
                elapsed_secs = elapsed.as_secs(),
                threshold_secs = self.threshold.as_secs(),
                "item exceeded the recommended watchdog threshold"
            );
        }
    }
}
