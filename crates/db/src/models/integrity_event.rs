use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only step in a segment's hash chain (spec.md §3/§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IntegrityEvent {
    pub id: Uuid,
    pub segment_id: Uuid,
    pub stage: String,
    pub content_hash: String,
    pub prev_hash: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl IntegrityEvent {
    pub const TABLE: &'static str = "integrity_events";

    pub const STAGE_INGEST_RECEIVED: &'static str = "ingest_received";
    pub const STAGE_FILTER_PRE_ASR: &'static str = "filter_pre_asr";
    pub const STAGE_TRANSCRIPTION_COMPLETE: &'static str = "transcription_complete";
    pub const STAGE_FILTER_POST_ASR: &'static str = "filter_post_asr";
    pub const STAGE_PERSISTED: &'static str = "persisted";
    pub const STAGE_ENRICHED: &'static str = "enriched";

    pub const STAGES: &'static [&'static str] = &[
        Self::STAGE_INGEST_RECEIVED,
        Self::STAGE_FILTER_PRE_ASR,
        Self::STAGE_TRANSCRIPTION_COMPLETE,
        Self::STAGE_FILTER_POST_ASR,
        Self::STAGE_PERSISTED,
        Self::STAGE_ENRICHED,
    ];
}
