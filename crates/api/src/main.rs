//! Process entrypoint: load configuration, open the pool, wire the
//! background workers, and serve the ingestion router.

use std::sync::Arc;

use memoire_config::Settings;
use memoire_services::enrichment::{EnrichmentWorker, HttpEnrichmentBackend};
use memoire_services::integrity::IntegrityChain;
use memoire_services::memory::MemoryConsolidator;
use memoire_services::privacy::LexiconPersonDetector;
use memoire_services::retention::RetentionJob;
use memoire_transcription::AsrSingleton;
use tokio_cron_scheduler::JobScheduler;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// The retention sweep's cadence. Not one of spec.md §6's per-rule
/// knobs (those cover age/action), so kept as a process constant —
/// daily at 03:00 matches the "periodic" cadence spec.md §4.11
/// describes without naming an exact schedule.
const RETENTION_CRON: &str = "0 0 3 * * *";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let settings = Settings::load()?;
    tracing::info!(port = settings.ingestion_port, "loaded configuration");

    let pool = memoire_db::connect(&settings.database_url).await?;

    tokio::fs::create_dir_all(&settings.staging_dir).await.ok();

    let settings = Arc::new(settings);
    let integrity = Arc::new(IntegrityChain::new(pool.clone()));
    let consolidator = Arc::new(MemoryConsolidator::new(pool.clone()));
    let enrichment_backend = Arc::new(HttpEnrichmentBackend::new(
        settings.enrichment_endpoint.clone(),
        settings.enrichment_model_id.clone(),
    ));
    let enrichment = Arc::new(EnrichmentWorker::new(
        pool.clone(),
        enrichment_backend,
        integrity.clone(),
        consolidator.clone(),
        &settings.enrichment_backoff_schedule_secs,
        settings.enrichment_retry_count,
    ));

    let state = memoire_api::state::AppState {
        pool: pool.clone(),
        settings: settings.clone(),
        asr: Arc::new(AsrSingleton::new()),
        integrity,
        enrichment,
        memory: consolidator,
        person_detector: Arc::new(LexiconPersonDetector),
    };

    if !settings.retention_rules.is_empty() {
        let retention = Arc::new(RetentionJob::new(
            pool.clone(),
            settings.retention_rules.clone(),
            std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into()),
        ));
        let scheduler = JobScheduler::new().await?;
        retention.schedule(&scheduler, RETENTION_CRON).await?;
        scheduler.start().await?;
        tracing::info!(rules = settings.retention_rules.len(), "retention sweep scheduled");
    }

    let router = memoire_api::build_router(state);

    let addr = format!("0.0.0.0:{}", settings.ingestion_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
