//! Default timing constants (spec §5). Implementations may override these
//! via [`crate::config::WorkerConfig`]; these are the fallback values.

use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_ITEMS_PER_TICK_CRAWL: u32 = 10;
pub const DEFAULT_ITEMS_PER_TICK_DISCOVERY: u32 = 10;
pub const DEFAULT_ITEMS_PER_TICK_AGGREGATION: u32 = 10;
pub const DEFAULT_ITEMS_PER_TICK_VIDEO_PROCESSING: u32 = 1;
pub const DEFAULT_ITEMS_PER_TICK_VIDEO_DISCOVERY: u32 = 50;

/// A single item whose handling takes longer than `JobTimeout / 4` without a
/// heartbeat should trip the watchdog warning (§9 "Backpressure on long
/// batches").
pub fn watchdog_threshold(job_timeout: Duration) -> Duration {
    job_timeout / 4
}
