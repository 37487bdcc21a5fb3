use chrono::{DateTime, Utc};
use memoire_db::Segment;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::base::{BaseDao, DaoResult};

#[derive(Clone)]
pub struct SegmentDao {
    pub base: BaseDao<Segment>,
    pool: PgPool,
}

impl SegmentDao {
    pub fn new(pool: PgPool) -> Self {
        Self {
            base: BaseDao::new(pool.clone(), Segment::TABLE),
            pool,
        }
    }

    /// Idempotent insert keyed on `segment_id` (spec.md §3 invariant 3,
    /// §4.7): a retransmitted segment_id is a no-op that returns the
    /// existing row rather than erroring.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_or_get(
        &self,
        id: Uuid,
        path: &str,
        byte_length: i64,
        sample_rate: i32,
        channels: i16,
        bit_depth: i16,
    ) -> DaoResult<(Segment, bool)> {
        let inserted: Option<Segment> = sqlx::query_as(
            r#"
            INSERT INTO segments (id, path, byte_length, sample_rate, channels, bit_depth, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(path)
        .bind(byte_length)
        .bind(sample_rate)
        .bind(channels)
        .bind(bit_depth)
        .bind(Segment::STATUS_RECEIVED)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok((row, true)),
            None => Ok((self.base.find_by_id(id).await?, false)),
        }
    }

    pub async fn set_status(&self, id: Uuid, status: &str) -> DaoResult<()> {
        sqlx::query("UPDATE segments SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DaoResult<Segment> {
        self.base.find_by_id(id).await
    }

    pub async fn older_than(&self, cutoff: DateTime<Utc>) -> DaoResult<Vec<Segment>> {
        Ok(sqlx::query_as("SELECT * FROM segments WHERE created_at < $1")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?)
    }
}
