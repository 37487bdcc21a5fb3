//! `IntegrityChain` (spec.md §4.8): per-segment SHA-256 hash chain over
//! canonical JSON stage payloads.

use chrono::{DateTime, SubsecRound, Utc};
use memoire_db::IntegrityEvent;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgTransaction};
use uuid::Uuid;

use crate::dao::{DaoError, IntegrityEventDao};

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("dao error: {0}")]
    Dao(#[from] DaoError),
    #[error(
        "integrity chain diverged for segment {segment_id} at event {event_id}: prev_hash mismatch"
    )]
    Divergence { segment_id: Uuid, event_id: Uuid },
}

#[derive(Serialize)]
struct StagePayload<'a> {
    stage: &'a str,
    segment_id: Uuid,
    timestamp: DateTime<Utc>,
    payload: serde_json::Value,
}

/// `serde_json::Map` is BTreeMap-backed in this workspace (the
/// `preserve_order` feature is not enabled), so `to_string` already
/// yields sorted keys and no insignificant whitespace — the canonical
/// encoding spec.md §4.8 requires.
fn canonical_hash(stage: &str, segment_id: Uuid, timestamp: DateTime<Utc>, payload: &serde_json::Value) -> String {
    let envelope = StagePayload {
        stage,
        segment_id,
        timestamp,
        payload: payload.clone(),
    };
    let canonical = serde_json::to_string(&envelope).expect("stage payload is always serializable");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct IntegrityChain {
    dao: IntegrityEventDao,
}

impl IntegrityChain {
    pub fn new(pool: PgPool) -> Self {
        Self {
            dao: IntegrityEventDao::new(pool),
        }
    }

    /// Appends a new event, looking up the current chain tail to set
    /// `prev_hash` (null for the first event, spec.md §3 invariant 2).
    pub async fn append(
        &self,
        segment_id: Uuid,
        stage: &str,
        payload: serde_json::Value,
    ) -> Result<IntegrityEvent, IntegrityError> {
        // Truncated to microseconds: Postgres `timestamptz` only
        // stores microsecond precision, so hashing the untruncated
        // nanosecond value here would make the round-tripped
        // `created_at` hash differently than what was stored.
        let timestamp = Utc::now().trunc_subsecs(6);
        let content_hash = canonical_hash(stage, segment_id, timestamp, &payload);

        let prev = self.dao.latest_for_segment(segment_id).await?;
        let prev_hash = prev.map(|e| e.content_hash);

        Ok(self
            .dao
            .insert(
                Uuid::new_v4(),
                segment_id,
                stage,
                &content_hash,
                prev_hash.as_deref(),
                payload,
                timestamp,
            )
            .await?)
    }

    /// Same as `append` but participates in a caller-owned transaction
    /// (spec.md §4.7's "persistence + integrity append use a
    /// transaction").
    pub async fn append_in_tx(
        tx: &mut PgTransaction<'_>,
        segment_id: Uuid,
        stage: &str,
        payload: serde_json::Value,
    ) -> Result<IntegrityEvent, IntegrityError> {
        // Truncated to microseconds: Postgres `timestamptz` only
        // stores microsecond precision, so hashing the untruncated
        // nanosecond value here would make the round-tripped
        // `created_at` hash differently than what was stored.
        let timestamp = Utc::now().trunc_subsecs(6);
        let content_hash = canonical_hash(stage, segment_id, timestamp, &payload);

        let prev = IntegrityEventDao::latest_for_segment_in_tx(tx, segment_id).await?;
        let prev_hash = prev.map(|e| e.content_hash);

        Ok(IntegrityEventDao::insert_in_tx(
            tx,
            Uuid::new_v4(),
            segment_id,
            stage,
            &content_hash,
            prev_hash.as_deref(),
            payload,
            timestamp,
        )
        .await?)
    }

    /// Walks the chain in `created_at` order, recomputing each event's
    /// hash from its stored `(stage, segment_id, created_at, metadata)`
    /// and comparing it against the stored `content_hash` — catching a
    /// row whose `metadata` was mutated in place without the chain
    /// link itself being touched — and verifying `prev_hash` linkage
    /// against the previous (stored) `content_hash`, per spec.md §4.8's
    /// "verification ... recomputing hashes and comparing prev_hash".
    /// Returns the events, whether the chain is consistent, and the id
    /// of the first divergent event if not (spec.md S5: the trail
    /// response "identifies the first divergent event").
    pub async fn trail(
        &self,
        segment_id: Uuid,
    ) -> Result<(Vec<IntegrityEvent>, bool, Option<Uuid>), IntegrityError> {
        let events = self.dao.trail(segment_id).await?;
        let mut first_divergent = None;
        let mut expected_prev: Option<&str> = None;

        for event in &events {
            let recomputed = canonical_hash(&event.stage, event.segment_id, event.created_at, &event.metadata);
            let prev_ok = match (&expected_prev, &event.prev_hash) {
                (None, None) => true,
                (Some(exp), Some(got)) => *exp == got.as_str(),
                _ => false,
            };

            if !prev_ok || recomputed != event.content_hash {
                first_divergent = Some(event.id);
                break;
            }
            expected_prev = Some(&event.content_hash);
        }

        Ok((events, first_divergent.is_none(), first_divergent))
    }

    /// Same as `trail` but raises `IntegrityChainDivergence` instead of
    /// returning a flag, for callers that treat divergence as fatal
    /// (spec.md §7).
    pub async fn verify(&self, segment_id: Uuid) -> Result<Vec<IntegrityEvent>, IntegrityError> {
        let (events, consistent, first_divergent) = self.trail(segment_id).await?;
        if !consistent {
            return Err(IntegrityError::Divergence {
                segment_id,
                event_id: first_divergent.unwrap_or_default(),
            });
        }
        Ok(events)
    }

    pub async fn count_stage(&self, segment_id: Uuid, stage: &str) -> Result<i64, IntegrityError> {
        Ok(self.dao.count_stage(segment_id, stage).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_hash_is_deterministic() {
        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let id = Uuid::nil();
        let payload = serde_json::json!({ "b": 1, "a": 2 });
        let h1 = canonical_hash("persisted", id, ts, &payload);
        let h2 = canonical_hash("persisted", id, ts, &payload);
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_stage_changes_hash() {
        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let id = Uuid::nil();
        let payload = serde_json::json!({ "a": 1 });
        let h1 = canonical_hash("persisted", id, ts, &payload);
        let h2 = canonical_hash("enriched", id, ts, &payload);
        assert_ne!(h1, h2);
    }
}
