//! `GET /audit/trail/{segment_id}` (spec.md §4.8/§6): the ordered
//! integrity-event chain for a segment, plus whether it verifies.

use axum::{Json, extract::{Path, State}};
use memoire_db::IntegrityEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TrailResponse {
    segment_id: Uuid,
    consistent: bool,
    first_divergent_event_id: Option<Uuid>,
    events: Vec<IntegrityEvent>,
}

pub async fn get_trail(
    State(state): State<AppState>,
    Path(segment_id): Path<Uuid>,
) -> Result<Json<TrailResponse>, ApiError> {
    let (events, consistent, first_divergent_event_id) = state.integrity.trail(segment_id).await?;

    if events.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no integrity events recorded for segment {segment_id}"
        )));
    }

    Ok(Json(TrailResponse {
        segment_id,
        consistent,
        first_divergent_event_id,
        events,
    }))
}
