//! Capture client entrypoint: owns the microphone, segments speech,
//! and drains the durable upload queue to the ingestion server.

use std::sync::Arc;
use std::time::Duration;

use capture_client::{AlwaysOnline, ClientConfig, UploadQueue};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Background retry cadence (spec.md §4.2: "periodic retry when
/// network is available"). Not an enumerated §6 knob — the server's
/// knob list covers ingestion-side policy, not client scheduling.
const RETRY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "capture-client", about = "Continuous speech capture + upload queue")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the recording + upload loop (default if no subcommand given).
    Start,
    /// Report queue depth and exit.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::load()?;
    let data_dir = config.resolved_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let _log_guard = init_logging(&data_dir)?;

    let queue = Arc::new(UploadQueue::open(
        &data_dir.join("upload_queue.sqlite3"),
        config.max_queue_size,
        config.drop_oldest_on_overflow,
    )?);

    match cli.command.unwrap_or(Command::Start) {
        Command::Status => {
            println!("pending uploads: {}", queue.len()?);
            return Ok(());
        }
        Command::Start => {}
    }

    let device_id = capture_client::config::device_id(&data_dir);
    tracing::info!(server = %config.server_url, %device_id, data_dir = %data_dir.display(), "capture client starting");

    let segments_dir = data_dir.join("segments");
    let capture_rx = capture_client::capture::spawn_capture(config.vad_aggressiveness, segments_dir)?;

    let forward_queue = queue.clone();
    tokio::spawn(capture_client::capture::forward_to_queue(capture_rx, forward_queue));

    run_retry_loop(queue, config).await;
    Ok(())
}

/// Immediate-send-on-creation plus periodic retry (spec.md §4.2): the
/// same `drain_once` call serves both triggers, since a just-enqueued
/// segment and a stale retry both land in the same `pending` query.
async fn run_retry_loop(queue: Arc<UploadQueue>, config: ClientConfig) {
    let network = AlwaysOnline;
    let mut ticker = tokio::time::interval(RETRY_INTERVAL);
    loop {
        ticker.tick().await;
        capture_client::client::drain_once(&queue, &config, &network).await;
    }
}

fn init_logging(data_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "capture-client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
