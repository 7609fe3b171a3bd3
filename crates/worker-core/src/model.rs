//! Shared data model (spec §3): the job envelope, worker record, and lease
//! freshness check. Grounded on `client-engine/src/backend.rs`'s
//! `BackendJobDto` — the teacher's job DTO has one shape because it only
//! ever leases proof jobs; ours carries a `job_type` discriminant because
//! the claim engine polls six different collections (§4.1).

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The six job types sharing the claim/lease protocol (spec §1, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "kebab-case")]
pub enum JobType {
    Crawl,
    Discovery,
    IngredientDiscovery,
    VideoDiscovery,
    VideoProcessing,
    Aggregation,
}

impl JobType {
    /// The coordinator collection this job type's records live in.
    pub fn collection(self) -> &'static str {
        match self {
            JobType::Crawl => "crawl-jobs",
            JobType::Discovery => "discovery-jobs",
            JobType::IngredientDiscovery => "ingredient-discovery-jobs",
            JobType::VideoDiscovery => "video-discovery-jobs",
            JobType::VideoProcessing => "video-processing-jobs",
            JobType::Aggregation => "aggregation-jobs",
        }
    }

    /// The join-record collection this job type's batches write to (spec §3
    /// "Join records").
    pub fn results_collection(self) -> &'static str {
        match self {
            JobType::Crawl => "crawl-results",
            JobType::Discovery => "discovery-results",
            JobType::IngredientDiscovery => "ingredient-discovery-results",
            JobType::VideoDiscovery => "video-discovery-results",
            JobType::VideoProcessing => "video-processing-results",
            JobType::Aggregation => "aggregation-results",
        }
    }

    pub fn all() -> [JobType; 6] {
        [
            JobType::Crawl,
            JobType::Discovery,
            JobType::IngredientDiscovery,
            JobType::VideoDiscovery,
            JobType::VideoProcessing,
            JobType::Aggregation,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// The target-set scopes that trigger priority selection in the claim
/// engine (spec §4.1 step 3, GLOSSARY "Selected-target job"). Stored on the
/// job as a plain string (`target_scope`) because which scopes are
/// meaningful is per-job-type (crawl's `recrawl`/`all` are never priority;
/// `selected_urls`/`selected_gtins`/`from_discovery` always are).
pub const PRIORITY_SCOPES: &[&str] = &["selected_urls", "selected_gtins", "from_discovery"];

/// The common job envelope (spec §3 "Job"). `progress` is the opaque,
/// per-type cursor (spec §4.2, §9) — generic code never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(rename = "jobType")]
    pub job_type: JobType,
    #[serde(rename = "claimedBy")]
    pub claimed_by: Option<String>,
    #[serde(rename = "claimedAt")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub progressed: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(rename = "itemsPerTick")]
    pub items_per_tick: u32,
    /// The scope/target-set discriminant used for priority selection and,
    /// per job type, to choose which subset of the implicit work queue
    /// applies (e.g. crawl's `all | selected_urls | selected_gtins |
    /// from_discovery | recrawl`).
    #[serde(rename = "targetScope", default)]
    pub target_scope: Option<String>,
    /// Static, per-type configuration set once at job creation and never
    /// mutated by a worker (spec §9 "Dynamic record shapes": each job
    /// type's specific fields, tagged by `job_type`, encoded as opaque JSON
    /// here rather than a per-type struct field on the common envelope).
    /// Examples: discovery's `sourceUrls`, video-discovery's
    /// `channelExternalId`, video-processing's `{type, video, urls}`.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Opaque per-type cursor (spec §4.2). Decoded lazily by the matching
    /// work builder via [`crate::cursor::parse_cursor`].
    #[serde(default)]
    pub progress: serde_json::Value,
}

impl Job {
    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    /// True when this job's `target_scope` names an explicit target set
    /// (spec §4.1 step 3).
    pub fn is_priority(&self) -> bool {
        self.target_scope
            .as_deref()
            .is_some_and(|scope| PRIORITY_SCOPES.contains(&scope))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    Disabled,
}

/// The worker record (spec §3 "Worker").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub capabilities: Vec<JobType>,
    pub status: WorkerStatus,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// A lease is fresh iff `now - claimed_at < job_timeout` (spec §3 "Lease").
/// Freshness is re-evaluated on every claim attempt, never cached.
pub fn is_lease_fresh(claimed_at: DateTime<Utc>, now: DateTime<Utc>, job_timeout: Duration) -> bool {
    let timeout = chrono::Duration::from_std(job_timeout).unwrap_or(chrono::Duration::zero());
    now - claimed_at < timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_scope_detection() {
        let mut job = sample_job();
        job.target_scope = Some("selected_gtins".to_string());
        assert!(job.is_priority());

        job.target_scope = Some("all".to_string());
        assert!(!job.is_priority());

        job.target_scope = None;
        assert!(!job.is_priority());
    }

    #[test]
    fn lease_freshness_boundary() {
        let now = Utc::now();
        let timeout = Duration::from_secs(60);
        assert!(is_lease_fresh(now - chrono::Duration::seconds(30), now, timeout));
        assert!(!is_lease_fresh(now - chrono::Duration::seconds(90), now, timeout));
    }

    fn sample_job() -> Job {
        Job {
            id: "job-1".to_string(),
            created_at: Utc::now(),
            status: JobStatus::Pending,
            job_type: JobType::Crawl,
            claimed_by: None,
            claimed_at: None,
            started_at: None,
            completed_at: None,
            total: 0,
            progressed: 0,
            errors: 0,
            items_per_tick: 10,
            target_scope: None,
            config: serde_json::Value::Null,
            progress: serde_json::Value::Null,
        }
    }
}
