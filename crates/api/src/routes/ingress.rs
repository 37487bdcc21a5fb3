//! `/ingest` (spec.md §4.3/§6): one binary WAV payload in, one terminal
//! JSON message out. Bearer auth happens before the WebSocket upgrade,
//! mirroring the teacher's `ws_upgrade`/`handle_socket` split
//! (`crates/api/src/ws/handler.rs`).

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::HeaderMap,
    response::IntoResponse,
};
use memoire_services::filter_chain::{FilterReason, PostAsrGate, PreAsrGate};
use memoire_services::pipeline::PersistenceService;
use memoire_services::privacy;
use memoire_transcription::AsrRequest;
use memoire_transcription::wav;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Per-call ASR deadline (spec.md §5: "the implementation MUST provide
/// a per-stage deadline"). Not one of §6's enumerated knobs, so it's
/// kept as an internal constant rather than grown into new config
/// surface.
const ASR_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Received {
        file_id: Uuid,
    },
    Transcription {
        text: String,
        file_id: Uuid,
        delete_audio: bool,
    },
    Filtered {
        file_id: Uuid,
        reason: &'static str,
    },
    Error {
        message: String,
    },
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if token != Some(state.settings.bearer_token.as_str()) {
        return (axum::http::StatusCode::UNAUTHORIZED, "invalid bearer token").into_response();
    }

    let segment_id = params
        .get("segment_id")
        .and_then(|s| Uuid::parse_str(s).ok());

    ws.on_upgrade(move |socket| handle_socket(socket, state, segment_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, client_segment_id: Option<Uuid>) {
    let Some(msg) = socket.recv().await else {
        return;
    };
    let bytes = match msg {
        Ok(Message::Binary(b)) => b,
        Ok(Message::Close(_)) | Err(_) => return,
        Ok(_) => {
            let _ = send(&mut socket, &WireMessage::Error {
                message: "expected a binary WAV frame".into(),
            })
            .await;
            return;
        }
    };

    let reply = process_payload(&state, &bytes, client_segment_id, &mut socket).await;
    let _ = send(&mut socket, &reply).await;
}

async fn send(socket: &mut WebSocket, msg: &WireMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text.into())).await
}

/// Steps through spec.md §4.3's per-payload contract. Returns the
/// terminal message; the temp file is deleted on every exit path
/// (success or failure, step 5).
async fn process_payload(
    state: &AppState,
    bytes: &[u8],
    client_segment_id: Option<Uuid>,
    socket: &mut WebSocket,
) -> WireMessage {
    if bytes.len() > state.settings.max_payload_bytes {
        return WireMessage::Error {
            message: "payload exceeds max_payload_bytes".into(),
        };
    }

    if !wav::has_wav_magic(bytes) {
        return WireMessage::Error {
            message: "malformed payload: missing RIFF/WAVE magic bytes".into(),
        };
    }

    let segment_id = client_segment_id.unwrap_or_else(Uuid::new_v4);

    let (samples, sample_rate) = match wav::read_wav_bytes(bytes) {
        Ok(v) => v,
        Err(e) => {
            return WireMessage::Error {
                message: format!("malformed WAV payload: {e}"),
            };
        }
    };

    let staging_path = state.settings.staging_dir.join(format!("{segment_id}.wav"));
    if let Some(parent) = staging_path.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    if let Err(e) = tokio::fs::write(&staging_path, bytes).await {
        return WireMessage::Error {
            message: format!("failed to stage payload: {e}"),
        };
    }

    let outcome = run_pipeline(state, segment_id, &staging_path, &samples, sample_rate, socket).await;

    let _ = tokio::fs::remove_file(&staging_path).await;

    outcome
}

#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    state: &AppState,
    segment_id: Uuid,
    staging_path: &std::path::Path,
    samples: &[i16],
    sample_rate: u32,
    socket: &mut WebSocket,
) -> WireMessage {
    let _ = state
        .integrity
        .append(
            segment_id,
            "ingest_received",
            serde_json::json!({ "byte_length": samples.len() * 2, "sample_rate": sample_rate }),
        )
        .await;
    let _ = send(socket, &WireMessage::Received { file_id: segment_id }).await;

    let pre_gate = PreAsrGate::new(state.settings.pre_asr_filter_enabled);
    if let Some(reason) = pre_gate.check(samples, sample_rate) {
        let _ = state
            .integrity
            .append(segment_id, "filter_pre_asr", serde_json::json!({ "reason": reason.code() }))
            .await;
        info!(%segment_id, reason = reason.code(), "filtered pre-ASR");
        return WireMessage::Filtered { file_id: segment_id, reason: reason.code() };
    }

    let backend = match state.asr_backend().await {
        Ok(b) => b,
        Err(e) => {
            warn!(%segment_id, error = %e, "ASR backend unavailable");
            return WireMessage::Error { message: format!("ASR unavailable: {e}") };
        }
    };

    let request = AsrRequest {
        pcm16_mono_16k: samples.to_vec(),
        language_hint: None,
    };
    let asr_result = match tokio::time::timeout(ASR_DEADLINE, backend.transcribe(request)).await {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            warn!(%segment_id, error = %e, "ASR call failed");
            return WireMessage::Error { message: format!("transcription failed: {e}") };
        }
        Err(_) => {
            warn!(%segment_id, "ASR call timed out");
            return WireMessage::Error { message: "transcription timed out".into() };
        }
    };

    let _ = state
        .integrity
        .append(
            segment_id,
            "transcription_complete",
            serde_json::json!({ "text": asr_result.text, "language": asr_result.language }),
        )
        .await;

    let post_gate = PostAsrGate::new(
        state.settings.allowed_languages.clone(),
        state.settings.language_probability_threshold,
        state.settings.noise_phrases.clone(),
        state.settings.hallucination_phrases.clone(),
    );
    if let Some(reason) = post_gate.check(&asr_result.text, &asr_result.language, asr_result.language_probability) {
        let _ = state
            .integrity
            .append(segment_id, "filter_post_asr", serde_json::json!({ "reason": reason.code() }))
            .await;
        info!(%segment_id, reason = reason.code(), "filtered post-ASR");
        return WireMessage::Filtered { file_id: segment_id, reason: reason.code() };
    }

    let (output_text, detections) =
        privacy::transform(&asr_result.text, state.settings.privacy_mode, state.person_detector.as_ref());
    if state.settings.privacy_mode == memoire_config::PrivacyMode::Strict && !detections.is_empty() {
        let _ = state
            .integrity
            .append(
                segment_id,
                "filter_post_asr",
                serde_json::json!({ "reason": FilterReason::PiiBlocked.code(), "pii_classes": detections.len() }),
            )
            .await;
        info!(%segment_id, "filtered: pii_blocked under strict privacy mode");
        return WireMessage::Filtered {
            file_id: segment_id,
            reason: FilterReason::PiiBlocked.code(),
        };
    }

    let persistence = PersistenceService::new(state.pool.clone());
    let persisted = persistence
        .persist(
            segment_id,
            staging_path.to_string_lossy().as_ref(),
            (samples.len() * 2) as i64,
            sample_rate as i32,
            1,
            16,
            &output_text,
            &asr_result.language,
            asr_result.language_probability,
            asr_result.duration_sec,
            serde_json::to_value(&asr_result.spans).unwrap_or(serde_json::json!([])),
        )
        .await;

    let (transcription, inserted) = match persisted {
        Ok(v) => v,
        Err(e) => {
            warn!(%segment_id, error = %e, "persistence failed");
            return WireMessage::Error { message: format!("persistence failed: {e}") };
        }
    };

    if inserted {
        state.enrichment.clone().spawn(transcription.clone(), segment_id);
    }

    info!(%segment_id, transcription_id = %transcription.id, inserted, "transcription complete");

    WireMessage::Transcription {
        text: output_text,
        file_id: segment_id,
        delete_audio: true,
    }
}
