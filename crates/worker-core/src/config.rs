//! Process configuration (spec §6 "Environment variables"). Grounded on the
//! teacher's `client/src/cli.rs`: a `clap::Parser` where every field also
//! reads from an environment variable, so the worker can run unattended
//! under an orchestrator or be tweaked from a shell for local testing.

use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::model::JobType;

fn parse_url(s: &str) -> Result<Url, String> {
    Url::parse(s).map_err(|err| format!("invalid URL {s:?}: {err}"))
}

/// Worker process configuration. No field is persisted locally (spec §6
/// "Persisted state layout: none") — everything here is re-read at startup.
#[derive(Debug, Clone, Parser)]
#[command(name = "ingest-worker", version, about = "Content-ingestion pipeline worker")]
pub struct WorkerConfig {
    /// Base URL of the coordinator.
    #[arg(long, env = "COORDINATOR_URL", value_parser = parse_url)]
    pub coordinator_url: Url,

    /// API key sent as the coordinator's auth header.
    #[arg(long, env = "API_KEY")]
    pub api_key: String,

    /// Seconds to sleep after an empty claim or any main-loop error.
    #[arg(long, env = "POLL_INTERVAL_SECONDS", default_value_t = 10)]
    pub poll_interval_seconds: u64,

    /// Minutes after which a claimed lease is considered stale.
    #[arg(long, env = "JOB_TIMEOUT_MINUTES", default_value_t = 30)]
    pub job_timeout_minutes: u64,

    /// Console log level.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Job types this worker process is willing to claim.
    #[arg(
        long,
        env = "WORKER_CAPABILITIES",
        value_delimiter = ',',
        default_value = "crawl,discovery,ingredient-discovery,video-discovery,video-processing,aggregation"
    )]
    pub capabilities: Vec<JobType>,

    /// Optional human-readable worker name, reported at `/me`.
    #[arg(long, env = "WORKER_NAME")]
    pub worker_name: Option<String>,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_args() {
        let cfg = WorkerConfig::parse_from([
            "ingest-worker",
            "--coordinator-url",
            "http://localhost:3000",
            "--api-key",
            "secret",
            "--capabilities",
            "crawl,discovery",
        ]);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(10));
        assert_eq!(cfg.job_timeout(), Duration::from_secs(30 * 60));
        assert_eq!(cfg.capabilities, vec![JobType::Crawl, JobType::Discovery]);
    }
}
