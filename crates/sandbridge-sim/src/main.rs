//! Sandbox runtime bridge simulator
//!
//! Usage:
//!   sandbridge-sim [OPTIONS]
//!
//! Example:
//!   sandbridge-sim --sessions 3 --secure-page --connect content.openttd.org:3978/tcp

use clap::Parser;
use sandbridge_harness::create_shared_backing;
use sandbridge_sim::{Args, run_sessions};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.bridge_config();
    let connect: Vec<_> = args.connect.iter().map(|target| target.0.clone()).collect();

    info!(
        sessions = args.sessions,
        mount = %config.layout.personal_dir.display(),
        bundle = %config.bundle.file_name,
        "starting simulation"
    );

    let backing = create_shared_backing();
    let outcomes = run_sessions(
        &config,
        &backing,
        args.fault_plan(),
        args.sessions,
        &args.hooks(),
        &connect,
    )
    .await?;

    let downloads: usize = outcomes.iter().map(|o| o.journal.downloads.len()).sum();
    let persisted = backing.lock().map(|store| store.file_count()).unwrap_or_default();
    info!(sessions = outcomes.len(), downloads, persisted, "simulation complete");

    Ok(())
}
