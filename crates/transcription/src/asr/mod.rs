#[cfg(feature = "local-whisper")]
pub mod local_whisper;

#[cfg(feature = "remote")]
pub mod remote;

pub mod singleton;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// PCM16 mono 16 kHz audio plus an optional language hint
/// (spec.md §4.5).
pub struct AsrRequest {
    pub pcm16_mono_16k: Vec<i16>,
    pub language_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSpan {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: f64,
}

/// The sentinel language code an `AsrBackend` returns when it detects a
/// language not in its own supported set — the filter stage treats this
/// as a normal rejection, not an error (spec.md §4.5).
pub const UNSUPPORTED_LANGUAGE: &str = "und";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrResult {
    pub text: String,
    pub language: String,
    pub language_probability: f64,
    pub duration_sec: f64,
    pub spans: Vec<AsrSpan>,
    pub confidence: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum AsrError {
    #[error("ASR call timed out")]
    Timeout,
    #[error("ASR backend error: {0}")]
    Backend(String),
}

/// Pluggable ASR backend (spec.md §4.5): a tagged variant rather than a
/// dynamic class hierarchy, per spec.md §9's dispatch guidance — any
/// type implementing this trait is a drop-in behind `AsrSingleton`.
#[async_trait]
pub trait AsrBackend: Send + Sync {
    async fn transcribe(&self, request: AsrRequest) -> Result<AsrResult, AsrError>;
    fn name(&self) -> &str;
    fn supports_language(&self, lang: &str) -> bool;
}
