use memoire_db::Transcription;
use sqlx::postgres::{PgPool, PgTransaction};
use uuid::Uuid;

use super::base::{BaseDao, DaoResult};

#[derive(Clone)]
pub struct TranscriptionDao {
    pub base: BaseDao<Transcription>,
    pool: PgPool,
}

impl TranscriptionDao {
    pub fn new(pool: PgPool) -> Self {
        Self {
            base: BaseDao::new(pool.clone(), Transcription::TABLE),
            pool,
        }
    }

    /// Idempotent insert keyed on `segment_id` within an existing
    /// transaction, so the row lands atomically with the `persisted`
    /// integrity append (spec.md §4.7/§5: "writes that must be atomic
    /// use a transaction"). Returns `(row, inserted)`; `inserted=false`
    /// means a concurrent writer already won.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_in_tx(
        tx: &mut PgTransaction<'_>,
        id: Uuid,
        segment_id: Uuid,
        text: &str,
        detected_language: &str,
        language_probability: f64,
        duration_sec: f64,
        spans: serde_json::Value,
    ) -> DaoResult<(Transcription, bool)> {
        let inserted: Option<Transcription> = sqlx::query_as(
            r#"
            INSERT INTO transcriptions
                (id, segment_id, text, detected_language, language_probability, duration_sec, spans)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (segment_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(segment_id)
        .bind(text)
        .bind(detected_language)
        .bind(language_probability)
        .bind(duration_sec)
        .bind(spans)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(row) => Ok((row, true)),
            None => {
                let existing: Transcription =
                    sqlx::query_as("SELECT * FROM transcriptions WHERE segment_id = $1")
                        .bind(segment_id)
                        .fetch_one(&mut **tx)
                        .await?;
                Ok((existing, false))
            }
        }
    }

    pub async fn find_by_segment_id(&self, segment_id: Uuid) -> DaoResult<Option<Transcription>> {
        Ok(
            sqlx::query_as("SELECT * FROM transcriptions WHERE segment_id = $1")
                .bind(segment_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn find_by_id(&self, id: Uuid) -> DaoResult<Transcription> {
        self.base.find_by_id(id).await
    }
}
