use memoire_db::MemoryNode;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::base::{BaseDao, DaoResult};

#[derive(Clone)]
pub struct MemoryNodeDao {
    pub base: BaseDao<MemoryNode>,
    pool: PgPool,
}

impl MemoryNodeDao {
    pub fn new(pool: PgPool) -> Self {
        Self {
            base: BaseDao::new(pool.clone(), MemoryNode::TABLE),
            pool,
        }
    }

    /// Exactly one `MemoryNode` per `StructuredEvent` (spec.md §4.10),
    /// enforced by the unique constraint on `source_transcription_id`.
    pub async fn insert(
        &self,
        id: Uuid,
        source_segment_id: Uuid,
        source_transcription_id: Uuid,
        content: &str,
        summary: &str,
        topics: &[String],
        entities: &[String],
    ) -> DaoResult<MemoryNode> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO memory_nodes
                (id, source_segment_id, source_transcription_id, content, summary, topics, entities)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(source_segment_id)
        .bind(source_transcription_id)
        .bind(content)
        .bind(summary)
        .bind(topics)
        .bind(entities)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Candidate pool for `MemoryConsolidator::search` (spec.md §4.10).
    /// Bounded scan; the ranking itself happens in `memory::MemoryRanker`.
    pub async fn recent(&self, limit: i64) -> DaoResult<Vec<MemoryNode>> {
        Ok(
            sqlx::query_as("SELECT * FROM memory_nodes ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
