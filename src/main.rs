use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seatsweep::engine::{Runner, RunnerConfig, SystemClock};
use seatsweep::notify::WebhookSink;
use seatsweep::presence::spawn_presence;
use seatsweep::process::{install_signal_handler, ShutdownFlag};
use seatsweep::store::{HttpStore, RecordStore};
use seatsweep::surface::BridgeSurface;

#[derive(Parser)]
#[command(name = "seatsweep")]
#[command(about = "Course seat-availability monitor", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the record store API
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    store_url: String,

    /// Base URL of the content-surface bridge
    #[arg(long, default_value = "http://127.0.0.1:4444")]
    bridge_url: String,

    /// Public scheduler URL to include in availability notifications
    #[arg(long, default_value = "")]
    scheduler_url: String,

    /// Seconds between presence reports
    #[arg(long, default_value_t = 300)]
    presence_interval: u64,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownFlag::default();
    install_signal_handler(shutdown.clone())?;

    let store = Arc::new(HttpStore::new(&cli.store_url)?);
    let surface = BridgeSurface::new(&cli.bridge_url)?;
    let sink = WebhookSink::new()?;
    let clock = SystemClock;

    let presence = spawn_presence(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        shutdown.clone(),
        Duration::from_secs(cli.presence_interval),
    );

    let config = RunnerConfig {
        scheduler_url: cli.scheduler_url.clone(),
        ..RunnerConfig::default()
    };
    let mut runner = Runner::new(
        &surface,
        store.as_ref(),
        &sink,
        &clock,
        shutdown.clone(),
        config,
    );

    if cli.once {
        runner.cycle();
    } else {
        runner.run();
    }

    shutdown.set();
    if presence.join().is_err() {
        info!("presence thread exited abnormally");
    }
    info!("shutdown complete");
    Ok(())
}
