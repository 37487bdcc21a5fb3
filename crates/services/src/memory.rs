//! `MemoryConsolidator` (spec.md §4.10): turns a `StructuredEvent` into
//! exactly one retrievable `MemoryNode`, plus a substring+token-overlap
//! MVP ranking function for `search`.

use memoire_db::{MemoryNode, StructuredEvent, Transcription};
use sqlx::postgres::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::MemoryNodeDao;

/// Isolated behind a trait so a future vector-search implementation is
/// a drop-in without touching the consolidation contract (spec.md
/// §4.10's explicit forward-compat note).
pub trait MemoryRanker: Send + Sync {
    fn score(&self, query: &str, node: &MemoryNode) -> f64;
}

/// Substring match plus token (whitespace-split, lowercased) overlap —
/// the MVP ranker spec.md §4.10 names explicitly.
pub struct SubstringTokenOverlapRanker;

impl MemoryRanker for SubstringTokenOverlapRanker {
    fn score(&self, query: &str, node: &MemoryNode) -> f64 {
        let query_lower = query.to_lowercase();
        let haystack = format!("{} {}", node.content, node.summary).to_lowercase();

        let substring_score = if haystack.contains(&query_lower) { 1.0 } else { 0.0 };

        let query_tokens: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
        let haystack_tokens: std::collections::HashSet<&str> = haystack.split_whitespace().collect();
        let overlap = query_tokens.intersection(&haystack_tokens).count();
        let overlap_score = if query_tokens.is_empty() {
            0.0
        } else {
            overlap as f64 / query_tokens.len() as f64
        };

        0.6 * substring_score + 0.4 * overlap_score
    }
}

pub struct MemoryConsolidator {
    pool: PgPool,
    ranker: Box<dyn MemoryRanker>,
}

impl MemoryConsolidator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ranker: Box::new(SubstringTokenOverlapRanker),
        }
    }

    pub fn with_ranker(pool: PgPool, ranker: Box<dyn MemoryRanker>) -> Self {
        Self { pool, ranker }
    }

    /// Extracts `{content, summary, topics, entities}` from a
    /// `StructuredEvent` and writes one `MemoryNode`. `entities` is
    /// approximated from `[PERSON]`-style masked spans the transcription
    /// no longer carries; absent a dedicated entity list, topics double
    /// as the entity seed — callers relying on named entities should
    /// extend `StructuredEvent` rather than parse this fallback.
    pub async fn consolidate(
        &self,
        segment_id: Uuid,
        transcription: &Transcription,
        event: &StructuredEvent,
    ) {
        let dao = MemoryNodeDao::new(self.pool.clone());
        let entities: Vec<String> = event.topics.clone();

        match dao
            .insert(
                Uuid::new_v4(),
                segment_id,
                transcription.id,
                &transcription.text,
                &event.summary,
                &event.topics,
                &entities,
            )
            .await
        {
            Ok(node) => info!(%segment_id, memory_node_id = %node.id, "memory node consolidated"),
            Err(e) => warn!(%segment_id, error = %e, "failed to consolidate memory node"),
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> Vec<MemoryNode> {
        let dao = MemoryNodeDao::new(self.pool.clone());
        let candidates = match dao.recent(500).await {
            Ok(nodes) => nodes,
            Err(_) => return Vec::new(),
        };

        let mut scored: Vec<(f64, MemoryNode)> = candidates
            .into_iter()
            .map(|n| (self.ranker.score(query, &n), n))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, n)| n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(content: &str, summary: &str) -> MemoryNode {
        MemoryNode {
            id: Uuid::new_v4(),
            source_segment_id: Uuid::new_v4(),
            source_transcription_id: Uuid::new_v4(),
            content: content.into(),
            summary: summary.into(),
            topics: vec![],
            entities: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn substring_match_outranks_no_match() {
        let ranker = SubstringTokenOverlapRanker;
        let hit = node("нужно позвонить ивану завтра", "звонок ивану");
        let miss = node("купить хлеба", "покупки");
        assert!(ranker.score("позвонить ивану", &hit) > ranker.score("позвонить ивану", &miss));
    }
}
