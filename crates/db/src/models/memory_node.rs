use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retrievable memory extracted from a `StructuredEvent`. At most one
/// per transcription (spec.md §3 invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemoryNode {
    pub id: Uuid,
    pub source_segment_id: Uuid,
    pub source_transcription_id: Uuid,
    pub content: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MemoryNode {
    pub const TABLE: &'static str = "memory_nodes";
}
