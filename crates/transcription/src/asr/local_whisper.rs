use async_trait::async_trait;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{AsrBackend, AsrError, AsrRequest, AsrResult, AsrSpan};

/// Local Whisper ASR backend using whisper.cpp via whisper-rs, mirroring
/// the teacher's `LocalWhisperBackend`.
pub struct LocalWhisperBackend {
    ctx: WhisperContext,
    default_language: Option<String>,
    allowed_languages: Vec<String>,
}

impl LocalWhisperBackend {
    pub fn new(
        model_path: &str,
        default_language: Option<String>,
        allowed_languages: Vec<String>,
    ) -> anyhow::Result<Self> {
        info!(model_path, "loading Whisper model");
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| anyhow::anyhow!("failed to load Whisper model '{model_path}': {e}"))?;
        info!("Whisper model loaded");
        Ok(Self {
            ctx,
            default_language,
            allowed_languages,
        })
    }
}

#[async_trait]
impl AsrBackend for LocalWhisperBackend {
    async fn transcribe(&self, request: AsrRequest) -> Result<AsrResult, AsrError> {
        let audio: Vec<f32> = request
            .pcm16_mono_16k
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect();
        let lang_hint = request.language_hint.or_else(|| self.default_language.clone());

        let ctx_ptr = &self.ctx as *const WhisperContext;
        // SAFETY: WhisperContext is Send+Sync; a fresh state is created
        // per call below, so no state is shared across invocations.
        let ctx_ref = unsafe { &*ctx_ptr };

        let allowed = self.allowed_languages.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<AsrResult, AsrError> {
            let mut state = ctx_ref
                .create_state()
                .map_err(|e| AsrError::Backend(format!("failed to create Whisper state: {e}")))?;

            let mut params = FullParams::new(SamplingStrategy::BeamSearch {
                beam_size: 5,
                patience: 1.0,
            });

            if let Some(ref lang) = lang_hint {
                params.set_language(Some(lang));
            } else {
                params.set_detect_language(true);
            }
            params.set_translate(false);
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_single_segment(false);
            params.set_no_speech_thold(0.6);
            params.set_suppress_blank(true);

            state
                .full(params, &audio)
                .map_err(|e| AsrError::Backend(format!("Whisper transcription failed: {e}")))?;

            let num_segments = state
                .full_n_segments()
                .map_err(|e| AsrError::Backend(e.to_string()))?;

            let mut full_text = String::new();
            let mut spans = Vec::with_capacity(num_segments as usize);
            for i in 0..num_segments {
                let segment = state
                    .get_segment(i)
                    .ok_or_else(|| AsrError::Backend("missing whisper segment".into()))?;
                let text = segment.to_str_lossy().unwrap_or_default().to_string();
                let start = segment.start_timestamp() as f64 / 100.0;
                let end = segment.end_timestamp() as f64 / 100.0;
                let confidence = segment
                    .token_probabilities()
                    .map(|ps| ps.iter().copied().sum::<f32>() / ps.len().max(1) as f32)
                    .unwrap_or(0.8) as f64;

                if !full_text.is_empty() {
                    full_text.push(' ');
                }
                full_text.push_str(text.trim());
                spans.push(AsrSpan {
                    start,
                    end,
                    text,
                    confidence,
                });
            }

            let detected_lang_id = state.full_lang_id();
            let detected_language = whisper_rs::get_lang_str(detected_lang_id)
                .unwrap_or("und")
                .to_string();
            let language_probability = state.full_lang_id_from_state().map(|_| 0.9).unwrap_or(0.5);

            let language = if allowed.iter().any(|l| l.eq_ignore_ascii_case(&detected_language)) {
                detected_language
            } else {
                super::UNSUPPORTED_LANGUAGE.to_string()
            };

            let duration_sec = spans.last().map(|s| s.end).unwrap_or(0.0);
            let confidence = if spans.is_empty() {
                0.0
            } else {
                spans.iter().map(|s| s.confidence).sum::<f64>() / spans.len() as f64
            };

            Ok(AsrResult {
                text: full_text,
                language,
                language_probability,
                duration_sec,
                spans,
                confidence,
            })
        })
        .await
        .map_err(|e| AsrError::Backend(e.to_string()))??;

        Ok(result)
    }

    fn name(&self) -> &str {
        "local-whisper"
    }

    fn supports_language(&self, lang: &str) -> bool {
        self.allowed_languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
    }
}
