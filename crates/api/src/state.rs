//! Process-wide handles threaded through every handler (spec.md §9:
//! "pass handles through a top-level context" rather than implicit
//! globals). Mirrors the teacher's `AppState` composition
//! (`crates/api/src/state.rs`) with the chat-app services swapped for
//! the ingestion pipeline's.

use std::sync::Arc;

use memoire_config::Settings;
use memoire_services::enrichment::EnrichmentWorker;
use memoire_services::integrity::IntegrityChain;
use memoire_services::memory::MemoryConsolidator;
use memoire_services::privacy::LexiconPersonDetector;
use memoire_transcription::{AsrError, AsrSingleton};
use memoire_transcription::AsrBackend;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    pub asr: Arc<AsrSingleton>,
    pub integrity: Arc<IntegrityChain>,
    pub enrichment: Arc<EnrichmentWorker>,
    pub memory: Arc<MemoryConsolidator>,
    pub person_detector: Arc<LexiconPersonDetector>,
}

impl AppState {
    /// Resolves the process-wide ASR backend through the one-time
    /// latch, building it on first call (spec.md §4.5/§5: "initialized
    /// once at startup, then read-only").
    pub async fn asr_backend(&self) -> Result<Arc<dyn AsrBackend>, AsrError> {
        let settings = self.settings.clone();
        self.asr
            .get_or_init(|| async move { crate::asr_backend::build(&settings).await })
            .await
    }
}
