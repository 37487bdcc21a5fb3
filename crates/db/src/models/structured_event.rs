use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub priority: String,
    pub deadline: Option<DateTime<Utc>>,
}

/// Second-pass semantic extraction from a transcription. Immutable once
/// inserted (spec.md §3 invariant 1); absent entirely on enrichment
/// failure (invariant 4).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StructuredEvent {
    pub id: Uuid,
    pub transcription_id: Uuid,
    pub summary: String,
    pub topics: Vec<String>,
    pub domains: Vec<String>,
    pub emotions: Vec<String>,
    pub tasks: serde_json::Value,
    pub decisions: Vec<String>,
    pub urgency: String,
    pub sentiment: String,
    pub asr_confidence: Option<f64>,
    pub enrichment_confidence: f64,
    pub enrichment_model: String,
    pub enrichment_tokens: i32,
    pub enrichment_latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl StructuredEvent {
    pub const TABLE: &'static str = "structured_events";

    /// The closed domain vocabulary from spec.md §5/Glossary, plus the
    /// explicit allowance for custom domains (invariant 5).
    pub const CLOSED_DOMAINS: &'static [&'static str] = &[
        "work", "health", "family", "finance", "psychology", "relations", "growth", "leisure",
    ];

    pub fn tasks_typed(&self) -> Vec<Task> {
        serde_json::from_value(self.tasks.clone()).unwrap_or_default()
    }
}
