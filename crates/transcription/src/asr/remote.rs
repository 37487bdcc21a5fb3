use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AsrBackend, AsrError, AsrRequest, AsrResult};

/// ASR backend that delegates to an HTTP transcription service
/// (spec.md §4.5's "remote" variant). The wire format is a small JSON
/// envelope carrying base64 PCM, mirroring the enrichment worker's
/// `HttpEnrichmentBackend` in `memoire-services`.
pub struct RemoteAsrBackend {
    client: reqwest::Client,
    endpoint: String,
    allowed_languages: Vec<String>,
}

#[derive(Serialize)]
struct RemoteAsrRequest<'a> {
    audio_b64: &'a str,
    sample_rate: u32,
    language_hint: Option<&'a str>,
}

#[derive(Deserialize)]
struct RemoteAsrResponse {
    text: String,
    language: String,
    language_probability: f64,
    duration_sec: f64,
    spans: Vec<super::AsrSpan>,
    confidence: f64,
}

impl RemoteAsrBackend {
    pub fn new(endpoint: String, timeout: Duration, allowed_languages: Vec<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            allowed_languages,
        })
    }
}

#[async_trait]
impl AsrBackend for RemoteAsrBackend {
    async fn transcribe(&self, request: AsrRequest) -> Result<AsrResult, AsrError> {
        let bytes: Vec<u8> = request
            .pcm16_mono_16k
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let audio_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes);

        let body = RemoteAsrRequest {
            audio_b64: &audio_b64,
            sample_rate: 16_000,
            language_hint: request.language_hint.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AsrError::Timeout
                } else {
                    AsrError::Backend(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AsrError::Backend(format!(
                "remote ASR returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RemoteAsrResponse = response
            .json()
            .await
            .map_err(|e| AsrError::Backend(format!("malformed remote ASR response: {e}")))?;

        let language = if self
            .allowed_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&parsed.language))
        {
            parsed.language
        } else {
            super::UNSUPPORTED_LANGUAGE.to_string()
        };

        Ok(AsrResult {
            text: parsed.text,
            language,
            language_probability: parsed.language_probability,
            duration_sec: parsed.duration_sec,
            spans: parsed.spans,
            confidence: parsed.confidence,
        })
    }

    fn name(&self) -> &str {
        "remote"
    }

    fn supports_language(&self, lang: &str) -> bool {
        self.allowed_languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
    }
}
