//! The claim engine (spec §4.1): select one claimable job across a worker's
//! capability set and atomically acquire its lease.

use chrono::Utc;
use coordinator_client::{Compare, CoordinatorClient, Error as ClientError, FindOptions, Where};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use worker_core::model::{Job, JobType};

/// Bounded per-query page size for each of the three candidate queries in
/// step 1 (spec §4.1) — these are *candidate* pools, not the batch itself.
const CANDIDATE_PAGE_SIZE: u32 = 20;

pub struct ClaimEngine<'a> {
    client: &'a CoordinatorClient,
}

impl<'a> ClaimEngine<'a> {
    pub fn new(client: &'a CoordinatorClient) -> Self {
        Self { client }
    }

    /// Run the full claim algorithm (spec §4.1 steps 1-4). Returns the
    /// claimed job, or `None` for "no work" across every capability.
    pub async fn claim(&self, worker_id: &str, capabilities: &[JobType], job_timeout: Duration) -> anyhow::Result<Option<Job>> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::from_std(job_timeout).unwrap_or(chrono::Duration::zero());

        let mut candidates: HashMap<String, Job> = HashMap::new();
        for &job_type in capabilities {
            for job in self.fetch_candidates(job_type, cutoff).await? {
                candidates.entry(job.id.clone()).or_insert(job);
            }
        }

        let (mut priority, mut rest): (Vec<Job>, Vec<Job>) =
            candidates.into_values().partition(|job| job.is_priority());

        loop {
            let candidate = if !priority.is_empty() {
                Some(priority.remove(0))
            } else if !rest.is_empty() {
                // Random selection is a deliberate anti-affinity measure
                // (§9); never replace with a deterministic pick.
                let idx = rand::thread_rng().gen_range(0..rest.len());
                Some(rest.remove(idx))
            } else {
                None
            };

            let Some(candidate) = candidate else {
                return Ok(None);
            };

            match self.attempt_claim(&candidate, worker_id, now, cutoff).await {
                Ok(job) => return Ok(Some(job)),
                Err(err) if is_claim_loss(&err) => {
                    tracing::debug!(job_id = %candidate.id, "claim race lost, trying next candidate");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn fetch_candidates(&self, job_type: JobType, cutoff: chrono::DateTime<Utc>) -> anyhow::Result<Vec<Job>> {
        let collection = job_type.collection();
        let mut out = Vec::new();

        let released = Where::and([
            Compare::equals("status", "in_progress"),
            Compare::exists("claimedBy", false),
        ]);
        out.extend(self.find(collection, released).await?);

        let stale = Where::and([
            Compare::equals("status", "in_progress"),
            Compare::exists("claimedBy", true),
            Compare::less_than("claimedAt", cutoff.to_rfc3339()),
        ]);
        out.extend(self.find(collection, stale).await?);

        let pending = Compare::equals("status", "pending");
        out.extend(self.find(collection, pending).await?);

        Ok(out)
    }

    async fn find(&self, collection: &str, r#where: Where) -> anyhow::Result<Vec<Job>> {
        let opts = FindOptions {
            r#where: Some(r#where),
            limit: Some(CANDIDATE_PAGE_SIZE),
            sort: Some("createdAt".to_string()),
        };
        Ok(self.client.find::<Job>(collection, &opts).await?.docs)
    }

    /// Conditional update of the job's lease fields (spec §4.1 step 4). The
    /// coordinator's hook enforces the safety condition server-side; the
    /// `where` clause mirrors it so a rejection and a "matched nothing" both
    /// surface identically as a lost race.
    async fn attempt_claim(
        &self,
        candidate: &Job,
        worker_id: &str,
        now: chrono::DateTime<Utc>,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<Job, ClientError> {
        let safety = Where::or([
            Compare::exists("claimedBy", false),
            Compare::equals("claimedBy", worker_id),
            Compare::less_than("claimedAt", cutoff.to_rfc3339()),
        ]);
        let r#where = Where::and([Compare::equals("id", candidate.id.clone()), safety]);

        let update = serde_json::json!({
            "claimedBy": worker_id,
            "claimedAt": now,
        });

        self.client
            .update_by_where::<Job, _>(candidate.job_type.collection(), &r#where, &update)
            .await
    }
}

/// §9 open question: any non-2xx response to a claim attempt is a lost
/// race, never a hard error; the body is never inspected.
fn is_claim_loss(err: &ClientError) -> bool {
    coordinator_client::client::is_claim_rejection(err) || matches!(err, ClientError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_rejection_and_not_found_are_losses_not_errors() {
        assert!(is_claim_loss(&ClientError::ClaimRejected));
        assert!(is_claim_loss(&ClientError::NotFound));
        assert!(!is_claim_loss(&ClientError::Unauthorized));
    }
}
