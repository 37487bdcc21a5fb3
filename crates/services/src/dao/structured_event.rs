use memoire_db::StructuredEvent;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::base::{BaseDao, DaoResult};

#[derive(Clone)]
pub struct StructuredEventDao {
    pub base: BaseDao<StructuredEvent>,
    pool: PgPool,
}

impl StructuredEventDao {
    pub fn new(pool: PgPool) -> Self {
        Self {
            base: BaseDao::new(pool.clone(), StructuredEvent::TABLE),
            pool,
        }
    }

    /// At most one per transcription (spec.md §3 invariant 1). Enrichment
    /// only ever calls this after confirming no row exists, but the
    /// unique constraint on `transcription_id` is the real guarantee.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        id: Uuid,
        transcription_id: Uuid,
        summary: &str,
        topics: &[String],
        domains: &[String],
        emotions: &[String],
        tasks: serde_json::Value,
        decisions: &[String],
        urgency: &str,
        sentiment: &str,
        asr_confidence: Option<f64>,
        enrichment_confidence: f64,
        enrichment_model: &str,
        enrichment_tokens: i32,
        enrichment_latency_ms: i64,
    ) -> DaoResult<StructuredEvent> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO structured_events
                (id, transcription_id, summary, topics, domains, emotions, tasks, decisions,
                 urgency, sentiment, asr_confidence, enrichment_confidence, enrichment_model,
                 enrichment_tokens, enrichment_latency_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transcription_id)
        .bind(summary)
        .bind(topics)
        .bind(domains)
        .bind(emotions)
        .bind(tasks)
        .bind(decisions)
        .bind(urgency)
        .bind(sentiment)
        .bind(asr_confidence)
        .bind(enrichment_confidence)
        .bind(enrichment_model)
        .bind(enrichment_tokens)
        .bind(enrichment_latency_ms)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn find_by_transcription_id(
        &self,
        transcription_id: Uuid,
    ) -> DaoResult<Option<StructuredEvent>> {
        Ok(
            sqlx::query_as("SELECT * FROM structured_events WHERE transcription_id = $1")
                .bind(transcription_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
