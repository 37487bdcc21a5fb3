//! A queue-backed `AsrBackend` test double. Tests push the exact
//! `AsrResult` a call should return before triggering it, rather than
//! depending on a real Whisper model or remote service being reachable.

use std::collections::VecDeque;

use async_trait::async_trait;
use memoire_transcription::{AsrBackend, AsrError, AsrRequest, AsrResult};
use tokio::sync::Mutex;

pub struct StubAsrBackend {
    queue: Mutex<VecDeque<AsrResult>>,
}

impl StubAsrBackend {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn push_result(&self, result: AsrResult) {
        self.queue.lock().await.push_back(result);
    }
}

impl Default for StubAsrBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrBackend for StubAsrBackend {
    async fn transcribe(&self, _request: AsrRequest) -> Result<AsrResult, AsrError> {
        self.queue
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AsrError::Backend("no canned AsrResult queued for this call".into()))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn supports_language(&self, _lang: &str) -> bool {
        true
    }
}

/// A ready-to-use meaningful Russian utterance, matching the default
/// allowed-language/threshold settings.
pub fn meaningful_result(text: &str) -> AsrResult {
    AsrResult {
        text: text.to_string(),
        language: "ru".to_string(),
        language_probability: 0.95,
        duration_sec: 2.0,
        spans: vec![],
        confidence: 0.9,
    }
}
