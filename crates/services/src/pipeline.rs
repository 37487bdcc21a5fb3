//! The per-payload result sum type (spec.md §9: "replace exceptions
//! with a result sum `{Ok(T), Filtered(Reason), Err(Kind)}`"), and the
//! transactional persistence step that writes a `Transcription` row
//! together with the `persisted` integrity event (spec.md §4.7/§4.8).

use memoire_db::Transcription;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::dao::{DaoError, SegmentDao, TranscriptionDao};
use crate::filter_chain::FilterReason;
use crate::integrity::IntegrityChain;

/// The taxonomy from spec.md §7, modeled as tagged variants rather than
/// an exception hierarchy.
#[derive(Debug)]
pub enum PipelineOutcome {
    Transcription(Transcription),
    Filtered { reason: FilterReason },
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("dao error: {0}")]
    Dao(#[from] DaoError),
    #[error("integrity chain error: {0}")]
    Integrity(#[from] crate::integrity::IntegrityError),
    #[error("transaction error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub struct PersistenceService {
    pool: PgPool,
}

impl PersistenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes the `segments` + `transcriptions` rows and the
    /// `persisted` integrity event inside one transaction (spec.md
    /// §4.7: "writes that must be atomic use a transaction"). Idempotent
    /// on `segment_id`: a retransmitted segment_id returns the existing
    /// transcription with `inserted=false` rather than erroring
    /// (spec.md §3 invariant 3, §8 property 1).
    #[allow(clippy::too_many_arguments)]
    pub async fn persist(
        &self,
        segment_id: Uuid,
        path: &str,
        byte_length: i64,
        sample_rate: i32,
        channels: i16,
        bit_depth: i16,
        text: &str,
        detected_language: &str,
        language_probability: f64,
        duration_sec: f64,
        spans: serde_json::Value,
    ) -> Result<(Transcription, bool), PersistError> {
        let segment_dao = SegmentDao::new(self.pool.clone());
        segment_dao
            .insert_or_get(segment_id, path, byte_length, sample_rate, channels, bit_depth)
            .await?;

        let mut tx = self.pool.begin().await?;

        let (transcription, inserted) = TranscriptionDao::insert_in_tx(
            &mut tx,
            Uuid::new_v4(),
            segment_id,
            text,
            detected_language,
            language_probability,
            duration_sec,
            spans,
        )
        .await?;

        if inserted {
            IntegrityChain::append_in_tx(
                &mut tx,
                segment_id,
                "persisted",
                serde_json::json!({ "transcription_id": transcription.id }),
            )
            .await?;
        }

        tx.commit().await?;

        if inserted {
            segment_dao
                .set_status(segment_id, memoire_db::Segment::STATUS_TRANSCRIBED)
                .await?;
        }

        Ok((transcription, inserted))
    }
}
