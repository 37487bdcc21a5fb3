use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One utterance span within a transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSpan {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: f64,
}

/// Immutable once inserted (spec.md §3 invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transcription {
    pub id: Uuid,
    pub segment_id: Uuid,
    pub text: String,
    pub detected_language: String,
    pub language_probability: f64,
    pub duration_sec: f64,
    pub spans: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Transcription {
    pub const TABLE: &'static str = "transcriptions";

    pub fn spans_typed(&self) -> Vec<TranscriptSpan> {
        serde_json::from_value(self.spans.clone()).unwrap_or_default()
    }
}
