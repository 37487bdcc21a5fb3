//! A queue-backed `EnrichmentBackend` test double, mirroring
//! `StubAsrBackend` — enrichment runs on a detached background task
//! (spec.md §4.9/§5), so tests poll for the resulting row instead of
//! awaiting a response directly.

use std::collections::VecDeque;

use async_trait::async_trait;
use memoire_services::enrichment::{EnrichmentBackend, EnrichmentError, EnrichmentOutput};
use tokio::sync::Mutex;

pub struct StubEnrichmentBackend {
    queue: Mutex<VecDeque<Result<EnrichmentOutput, EnrichmentError>>>,
}

impl StubEnrichmentBackend {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn push(&self, result: Result<EnrichmentOutput, EnrichmentError>) {
        self.queue.lock().await.push_back(result);
    }
}

impl Default for StubEnrichmentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentBackend for StubEnrichmentBackend {
    async fn enrich(&self, _text: &str, _language: &str) -> Result<EnrichmentOutput, EnrichmentError> {
        self.queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(EnrichmentError::Permanent("no canned enrichment queued".into())))
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}

pub fn sample_output() -> EnrichmentOutput {
    EnrichmentOutput {
        summary: "Иван договорился позвонить завтра по проекту".to_string(),
        topics: vec!["проект".to_string(), "звонок".to_string()],
        domains: vec!["work".to_string()],
        emotions: vec!["neutral".to_string()],
        tasks: vec![],
        decisions: vec![],
        urgency: "medium".to_string(),
        sentiment: "neutral".to_string(),
        model: "stub".to_string(),
        tokens: 42,
    }
}
