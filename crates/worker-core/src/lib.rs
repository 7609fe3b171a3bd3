//! Shared data model and process scaffolding (spec §3, §6) used by both
//! `worker-engine` and the `worker` binary.

pub mod config;
pub mod constants;
pub mod cursor;
pub mod logging;
pub mod model;

pub use config::WorkerConfig;
pub use model::{is_lease_fresh, Job, JobStatus, JobType, Worker, WorkerStatus};
