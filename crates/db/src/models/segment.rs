use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded speech utterance awaiting or past processing (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Segment {
    pub id: Uuid,
    pub path: String,
    pub byte_length: i64,
    pub sample_rate: i32,
    pub channels: i16,
    pub bit_depth: i16,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Segment {
    pub const TABLE: &'static str = "segments";

    pub const STATUS_RECEIVED: &'static str = "received";
    pub const STATUS_TRANSCRIBED: &'static str = "transcribed";
    pub const STATUS_FILTERED: &'static str = "filtered";
}
