//! Logging initialization (SPEC_FULL §B). The teacher logs with bare
//! `println!`/`eprintln!`; this repository uses `tracing` +
//! `tracing-subscriber` instead, the stack this codebase's sibling CLI
//! tools already use for level-filtered structured logs
//! (`tracing_subscriber::fmt().with_env_filter(...)`).

use tracing_subscriber::EnvFilter;

/// Install a process-wide `tracing` subscriber filtered by `level`
/// (`debug|info|warn|error`). Writes to stderr so stdout stays free.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
