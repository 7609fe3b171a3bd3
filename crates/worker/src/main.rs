//! Process entry point (spec §6): parse config, authenticate, run the
//! claim/dispatch loop until a signal requests graceful shutdown.

mod shutdown;

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use coordinator_client::CoordinatorClient;
use worker_core::WorkerConfig;
use worker_engine::dispatch::Drivers;
use worker_engine::drivers::fake::{
    FakeCrawlDriver, FakeDiscoveryDriver, FakeIngredientDriver, FakeVideoDiscoveryDriver, FakeVideoProcessingDriver,
};
use worker_engine::mainloop;

use crate::shutdown::{spawn_ctrl_c_handler, ShutdownController, ShutdownEvent};

/// Driver implementations are the one seam this repository leaves for a
/// deployment to fill in (scrapers, LLM clients, media codecs, speech-to-
/// text); see `worker_engine::drivers::fake` for why the binary currently
/// wires in empty in-memory stand-ins instead.
fn build_drivers() -> (
    FakeCrawlDriver,
    FakeDiscoveryDriver,
    FakeIngredientDriver,
    FakeVideoDiscoveryDriver,
    FakeVideoProcessingDriver,
) {
    (
        FakeCrawlDriver { pages: HashMap::new() },
        FakeDiscoveryDriver {
            pages: tokio::sync::Mutex::new(Vec::new()),
        },
        FakeIngredientDriver { results: HashMap::new() },
        FakeVideoDiscoveryDriver { videos: Vec::new() },
        FakeVideoProcessingDriver { snippets: Vec::new() },
    )
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // `parse()` would exit(2) on a missing/invalid argument (clap's default),
    // but spec §6 mandates exit code 1 for "missing API key" at startup; a
    // `try_parse` lets us normalize that exit code while still honoring
    // `--help`/`--version`'s conventional exit 0.
    let config = match WorkerConfig::try_parse() {
        Ok(config) => config,
        Err(err) => {
            eprint!("{err}");
            return match err.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => std::process::ExitCode::SUCCESS,
                _ => std::process::ExitCode::FAILURE,
            };
        }
    };
    worker_core::logging::init(&config.log_level);

    let client = match CoordinatorClient::new(config.coordinator_url.clone(), config.api_key.clone()) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build coordinator client");
            return std::process::ExitCode::FAILURE;
        }
    };

    let worker = match mainloop::authenticate(&client).await {
        Ok(worker) => worker,
        Err(err) => {
            tracing::error!(error = %err, "startup authentication failed");
            return std::process::ExitCode::FAILURE;
        }
    };
    tracing::info!(worker_id = %worker.id, worker_name = %worker.name, "authenticated");

    let (crawl, discovery, ingredient, video_discovery, video_processing) = build_drivers();
    let drivers = Drivers {
        crawl: &crawl,
        discovery: &discovery,
        ingredient: &ingredient,
        video_discovery: &video_discovery,
        video_processing: &video_processing,
    };

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<ShutdownEvent>();
    spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);

    let stop_requested = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let poll_stop = stop_requested.clone();
    tokio::spawn(async move {
        if let Some(ShutdownEvent::Graceful | ShutdownEvent::Immediate) = shutdown_rx.recv().await {
            tracing::info!("shutdown requested, will stop after the current tick");
            poll_stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    mainloop::run(
        &client,
        &worker,
        &config.capabilities,
        config.job_timeout(),
        config.poll_interval(),
        &drivers,
        || stop_requested.load(std::sync::atomic::Ordering::SeqCst),
    )
    .await;

    std::process::ExitCode::SUCCESS
}
