//! `GET /enrichment/{segment_id}` (spec.md §6): the structured event a
//! segment's transcription was enriched into, if enrichment has run.

use axum::{Json, extract::{Path, State}};
use memoire_db::StructuredEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct EnrichmentResponse {
    segment_id: Uuid,
    transcription_id: Uuid,
    event: StructuredEvent,
}

pub async fn get_enrichment(
    State(state): State<AppState>,
    Path(segment_id): Path<Uuid>,
) -> Result<Json<EnrichmentResponse>, ApiError> {
    let transcription_dao = memoire_services::dao::TranscriptionDao::new(state.pool.clone());
    let transcription = transcription_dao
        .find_by_segment_id(segment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no transcription for segment {segment_id}")))?;

    let structured_event_dao = memoire_services::dao::StructuredEventDao::new(state.pool.clone());
    let event = structured_event_dao
        .find_by_transcription_id(transcription.id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no enrichment yet for segment {segment_id} (transcription {})",
                transcription.id
            ))
        })?;

    Ok(Json(EnrichmentResponse {
        segment_id,
        transcription_id: transcription.id,
        event,
    }))
}
