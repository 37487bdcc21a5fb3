use chrono::{DateTime, Utc};
use memoire_db::IntegrityEvent;
use sqlx::postgres::{PgPool, PgTransaction};
use uuid::Uuid;

use super::base::DaoResult;

#[derive(Clone)]
pub struct IntegrityEventDao {
    pool: PgPool,
}

impl IntegrityEventDao {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn latest_for_segment(&self, segment_id: Uuid) -> DaoResult<Option<IntegrityEvent>> {
        Ok(sqlx::query_as(
            "SELECT * FROM integrity_events WHERE segment_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(segment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// `created_at` is caller-supplied rather than left to the column's
    /// `DEFAULT now()` so it is exactly the timestamp the caller hashed
    /// into `content_hash` — otherwise `trail`'s recomputation would
    /// hash a different instant than the one actually stored and every
    /// chain would appear tampered.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        id: Uuid,
        segment_id: Uuid,
        stage: &str,
        content_hash: &str,
        prev_hash: Option<&str>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> DaoResult<IntegrityEvent> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO integrity_events (id, segment_id, stage, content_hash, prev_hash, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(segment_id)
        .bind(stage)
        .bind(content_hash)
        .bind(prev_hash)
        .bind(metadata)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Inserts within a caller-owned transaction, so the append lands
    /// atomically with the row it attests to (spec.md §4.7). Same
    /// caller-supplied `created_at` rationale as `insert` above.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_in_tx(
        tx: &mut PgTransaction<'_>,
        id: Uuid,
        segment_id: Uuid,
        stage: &str,
        content_hash: &str,
        prev_hash: Option<&str>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> DaoResult<IntegrityEvent> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO integrity_events (id, segment_id, stage, content_hash, prev_hash, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(segment_id)
        .bind(stage)
        .bind(content_hash)
        .bind(prev_hash)
        .bind(metadata)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await?)
    }

    /// `latest_for_segment` executed against the live transaction so the
    /// prev_hash lookup sees any row the same transaction just inserted.
    pub async fn latest_for_segment_in_tx(
        tx: &mut PgTransaction<'_>,
        segment_id: Uuid,
    ) -> DaoResult<Option<IntegrityEvent>> {
        Ok(sqlx::query_as(
            "SELECT * FROM integrity_events WHERE segment_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(segment_id)
        .fetch_optional(&mut **tx)
        .await?)
    }

    pub async fn trail(&self, segment_id: Uuid) -> DaoResult<Vec<IntegrityEvent>> {
        Ok(sqlx::query_as(
            "SELECT * FROM integrity_events WHERE segment_id = $1 ORDER BY created_at ASC",
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_stage(&self, segment_id: Uuid, stage: &str) -> DaoResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM integrity_events WHERE segment_id = $1 AND stage = $2",
        )
        .bind(segment_id)
        .bind(stage)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
