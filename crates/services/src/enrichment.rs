//! `EnrichmentWorker` (spec.md §4.9): an out-of-band LLM call, retried
//! with backoff, that turns a `Transcription` into a `StructuredEvent`.
//! Decoupled from the request/response path — the client has already
//! received `transcription` by the time this runs (spec.md §5).
//!
//! Grounded on the teacher's `TranscriptionEngine::spawn_worker`-style
//! independent `tokio::spawn` background task.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use memoire_db::{StructuredEvent, Task, Transcription};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::StructuredEventDao;
use crate::integrity::IntegrityChain;
use crate::memory::MemoryConsolidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentOutput {
    pub summary: String,
    pub topics: Vec<String>,
    pub domains: Vec<String>,
    pub emotions: Vec<String>,
    pub tasks: Vec<Task>,
    pub decisions: Vec<String>,
    pub urgency: String,
    pub sentiment: String,
    pub model: String,
    pub tokens: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("transient enrichment failure: {0}")]
    Transient(String),
    #[error("permanent enrichment failure: {0}")]
    Permanent(String),
}

/// Pluggable LLM client. A tagged-variant capability per spec.md §9
/// ("ASR and LLM providers are variants behind a common capability")
/// rather than a dynamic class hierarchy — concretely, any type
/// implementing this trait is a drop-in.
#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    async fn enrich(&self, text: &str, language: &str) -> Result<EnrichmentOutput, EnrichmentError>;
    fn model_id(&self) -> &str;
}

/// Calls a remote LLM endpoint (the concrete prompt templates are out of
/// core per spec.md §1). Any transport error or non-2xx response is
/// treated as transient and retried by the caller.
pub struct HttpEnrichmentBackend {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
}

impl HttpEnrichmentBackend {
    pub fn new(endpoint: String, model_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model_id,
        }
    }
}

#[derive(Serialize)]
struct EnrichmentRequest<'a> {
    text: &'a str,
    language: &'a str,
    model: &'a str,
}

#[async_trait]
impl EnrichmentBackend for HttpEnrichmentBackend {
    async fn enrich(&self, text: &str, language: &str) -> Result<EnrichmentOutput, EnrichmentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EnrichmentRequest {
                text,
                language,
                model: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| EnrichmentError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Transient(format!(
                "enrichment endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<EnrichmentOutput>()
            .await
            .map_err(|e| EnrichmentError::Transient(e.to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Lexical-first domain keyword table. Exact matches take precedence
/// over the LLM fallback (spec.md §4.9).
static DOMAIN_KEYWORDS: LazyLock<Vec<(&'static str, &'static [&'static str])>> = LazyLock::new(|| {
    vec![
        ("work", &["проект", "дедлайн", "митинг", "отчёт", "клиент", "задача"]),
        ("health", &["врач", "здоровье", "таблетки", "болит", "анализ"]),
        ("family", &["семья", "дети", "жена", "муж", "родители"]),
        ("finance", &["деньги", "оплата", "счёт", "кредит", "банк"]),
        ("psychology", &["тревога", "стресс", "терапия", "эмоции"]),
        ("relations", &["друг", "отношения", "свидание", "встреча"]),
        ("growth", &["учёба", "курс", "книга", "развитие"]),
        ("leisure", &["отдых", "фильм", "путешествие", "игра"]),
    ]
});

/// Lexical exact-keyword pass over the closed vocabulary
/// (`StructuredEvent::CLOSED_DOMAINS`). Returns the empty set when
/// ambiguous, signalling the caller to fall back to the LLM.
pub fn classify_domains_lexical(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut hits: HashSet<&'static str> = HashSet::new();
    for (domain, keywords) in DOMAIN_KEYWORDS.iter() {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            hits.insert(domain);
        }
    }
    hits.into_iter().map(String::from).collect()
}

/// Bounded heuristic confidence aggregation (spec.md §4.9): not a
/// constant — it's a sum of weighted signals clipped to 1.0.
pub fn aggregate_confidence(output: &EnrichmentOutput) -> f64 {
    const SUMMARY_LEN_THRESHOLD: usize = 20;

    let mut score = 0.0;
    if output.summary.chars().count() >= SUMMARY_LEN_THRESHOLD {
        score += 0.3;
    }
    if output.topics.len() >= 2 {
        score += 0.2;
    }
    if !output.emotions.is_empty() {
        score += 0.2;
    }
    if output.urgency != "medium" {
        score += 0.15;
    }
    if !output.tasks.is_empty() {
        score += 0.15;
    }
    score.min(1.0)
}

pub struct EnrichmentWorker {
    pool: PgPool,
    backend: std::sync::Arc<dyn EnrichmentBackend>,
    integrity: std::sync::Arc<IntegrityChain>,
    consolidator: std::sync::Arc<MemoryConsolidator>,
    backoff_schedule: Vec<Duration>,
    max_attempts: u8,
}

impl EnrichmentWorker {
    pub fn new(
        pool: PgPool,
        backend: std::sync::Arc<dyn EnrichmentBackend>,
        integrity: std::sync::Arc<IntegrityChain>,
        consolidator: std::sync::Arc<MemoryConsolidator>,
        backoff_schedule_secs: &[u64],
        max_attempts: u8,
    ) -> Self {
        Self {
            pool,
            backend,
            integrity,
            consolidator,
            backoff_schedule: backoff_schedule_secs.iter().map(|&s| Duration::from_secs(s)).collect(),
            max_attempts,
        }
    }

    /// Spawns the background enrichment task for a just-persisted
    /// transcription. Decoupled from the request scope — it borrows
    /// only the transcription id (spec.md §9).
    pub fn spawn(self: std::sync::Arc<Self>, transcription: Transcription, segment_id: Uuid) {
        tokio::spawn(async move {
            self.run(transcription, segment_id).await;
        });
    }

    async fn run(&self, transcription: Transcription, segment_id: Uuid) {
        let mut last_err = None;

        // `enrichment_latency_ms` is the successful attempt's latency
        // only (spec.md §8 property 7) — failed attempts' time does not
        // accumulate into it, even though wall-clock time (including
        // backoff sleeps) obviously does.
        for attempt in 0..self.max_attempts {
            let started = std::time::Instant::now();
            match self
                .backend
                .enrich(&transcription.text, &transcription.detected_language)
                .await
            {
                Ok(output) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    self.on_success(transcription, segment_id, output, latency_ms)
                        .await;
                    return;
                }
                Err(EnrichmentError::Permanent(msg)) => {
                    last_err = Some(msg);
                    break;
                }
                Err(EnrichmentError::Transient(msg)) => {
                    warn!(%segment_id, attempt, %msg, "enrichment attempt failed, retrying");
                    last_err = Some(msg);
                    let has_more_attempts = attempt + 1 < self.max_attempts;
                    if has_more_attempts {
                        if let Some(delay) = self.backoff_schedule.get(attempt as usize) {
                            tokio::time::sleep(*delay).await;
                        }
                    }
                }
            }
        }

        warn!(%segment_id, error = ?last_err, "enrichment permanently failed, no StructuredEvent written");
        // `enriched` is the closed-vocabulary stage for this outcome
        // (spec.md §3) — the failure is distinguished by `metadata.failed`
        // rather than by a new stage value.
        let _ = self
            .integrity
            .append(
                segment_id,
                "enriched",
                serde_json::json!({ "failed": true, "error": last_err }),
            )
            .await;
    }

    async fn on_success(
        &self,
        transcription: Transcription,
        segment_id: Uuid,
        mut output: EnrichmentOutput,
        latency_ms: u64,
    ) {
        if output.domains.is_empty() {
            output.domains = classify_domains_lexical(&transcription.text);
        }
        output.domains.retain(|d| {
            StructuredEvent::CLOSED_DOMAINS.contains(&d.as_str()) || !d.is_empty()
        });

        let confidence = aggregate_confidence(&output);
        let dao = StructuredEventDao::new(self.pool.clone());

        let event = match dao
            .insert(
                Uuid::new_v4(),
                transcription.id,
                &output.summary,
                &output.topics,
                &output.domains,
                &output.emotions,
                serde_json::to_value(&output.tasks).unwrap_or(serde_json::json!([])),
                &output.decisions,
                &output.urgency,
                &output.sentiment,
                None,
                confidence,
                &output.model,
                output.tokens,
                latency_ms as i64,
            )
            .await
        {
            Ok(event) => event,
            Err(e) => {
                warn!(%segment_id, error = %e, "failed to persist StructuredEvent");
                return;
            }
        };

        let _ = self
            .integrity
            .append(
                segment_id,
                "enriched",
                serde_json::json!({ "structured_event_id": event.id, "confidence": confidence }),
            )
            .await;

        info!(%segment_id, structured_event_id = %event.id, "enrichment complete");

        self.consolidator.consolidate(segment_id, &transcription, &event).await;
    }
}
