//! Drains the `UploadQueue` over a WebSocket connection to the
//! ingestion endpoint (spec.md §4.2/§6): one binary WAV frame sent per
//! connection, one terminal JSON message awaited back.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::network::NetworkMonitor;
use crate::queue::{UploadQueue, UploadStatus};

/// Per-upload deadline: a connection that never completes (server hung,
/// network black hole) must not wedge the drain loop forever.
const UPLOAD_DEADLINE: Duration = Duration::from_secs(60);

/// Mirrors the server's terminal message set (spec.md §6). Only the
/// tag and `file_id` matter to the client; body fields it doesn't use
/// are accepted but ignored via `serde(other)` / flatten-free parsing.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Received { file_id: Uuid },
    Transcription { file_id: Uuid, #[allow(dead_code)] text: String },
    Filtered { file_id: Uuid, #[allow(dead_code)] reason: String },
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("server reported an error: {0}")]
    ServerError(String),
    #[error("upload timed out")]
    Timeout,
    #[error("connection closed before a terminal message arrived")]
    ClosedEarly,
}

/// Sends one queued segment and waits for its terminal message. Returns
/// `Ok(())` for both `transcription` and `filtered` — from the client's
/// perspective both are terminal acks that retire the row (spec.md §3:
/// "discarded on client after server-confirmed terminal state
/// (`transcription` or `filtered`)"). Only `error` or a connection
/// failure is retried.
pub async fn upload_segment(config: &ClientConfig, segment_id: Uuid, path: &Path) -> Result<(), UploadError> {
    tokio::time::timeout(UPLOAD_DEADLINE, upload_inner(config, segment_id, path))
        .await
        .map_err(|_| UploadError::Timeout)?
}

async fn upload_inner(config: &ClientConfig, segment_id: Uuid, path: &Path) -> Result<(), UploadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| UploadError::Connect(format!("reading segment file: {e}")))?;

    let url = format!("{}?segment_id={}", config.server_url, segment_id);
    let mut request = url
        .into_client_request()
        .map_err(|e| UploadError::Connect(e.to_string()))?;
    request.headers_mut().insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|e| UploadError::Connect(e.to_string()))?,
    );

    let (mut stream, _) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| UploadError::Connect(e.to_string()))?;

    stream
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| UploadError::Connect(e.to_string()))?;

    while let Some(msg) = stream.next().await {
        let msg = msg.map_err(|e| UploadError::Connect(e.to_string()))?;
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => return Err(UploadError::ClosedEarly),
            _ => continue,
        };
        let parsed: WireMessage = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => continue,
        };
        match parsed {
            WireMessage::Received { .. } => continue,
            WireMessage::Transcription { .. } | WireMessage::Filtered { .. } => {
                let _ = stream.close(None).await;
                return Ok(());
            }
            WireMessage::Error { message } => {
                let _ = stream.close(None).await;
                return Err(UploadError::ServerError(message));
            }
        }
    }

    Err(UploadError::ClosedEarly)
}

/// One drain pass: sends every `pending` row oldest-first, stopping
/// early if another drain is already in flight (spec.md §4.2: "at most
/// one upload worker run concurrently per queue") or if the network
/// monitor reports no connectivity (spec.md §4.2: "retries only
/// proceed under constraints (`network_connected`)").
pub async fn drain_once(queue: &Arc<UploadQueue>, config: &ClientConfig, network: &dyn NetworkMonitor) {
    if !network.is_connected() {
        return;
    }
    if !queue.try_begin_drain() {
        return;
    }
    let result = drain_pending(queue, config).await;
    queue.end_drain();
    if let Err(e) = result {
        warn!(error = %e, "upload queue drain pass failed");
    }
}

async fn drain_pending(
    queue: &Arc<UploadQueue>,
    config: &ClientConfig,
) -> Result<(), crate::queue::QueueError> {
    for row in queue.pending()? {
        match upload_segment(config, row.segment_id, &row.file_path).await {
            Ok(()) => {
                info!(segment_id = %row.segment_id, "segment acknowledged, retiring from queue");
                queue.complete(row.segment_id)?;
            }
            Err(e) => {
                let status = queue.record_failure(row.segment_id, &e.to_string())?;
                if status == UploadStatus::Failed {
                    warn!(segment_id = %row.segment_id, "segment upload permanently failed, no further retries");
                } else {
                    warn!(segment_id = %row.segment_id, error = %e, "segment upload failed, will retry");
                }
            }
        }
    }
    Ok(())
}
