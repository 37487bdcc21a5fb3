//! Resolves the configured ASR backend variant (spec.md §4.5: "local
//! engine vs. remote service") behind the `AsrSingleton`'s one-time
//! latch. Which concrete backend this builds is a compile-time choice
//! (cargo feature), not a runtime one — the feature set pulls in only
//! the dependency (whisper.cpp bindings or an HTTP client) the
//! deployment actually needs.

use std::sync::Arc;
use std::time::Duration;

use memoire_config::Settings;
use memoire_transcription::{AsrBackend, AsrError};

#[cfg(feature = "local-whisper")]
pub async fn build(settings: &Settings) -> Result<Arc<dyn AsrBackend>, AsrError> {
    use memoire_transcription::asr::local_whisper::LocalWhisperBackend;

    let model_path = settings.asr_model_path.clone();
    let allowed = settings.allowed_languages.clone();
    tokio::task::spawn_blocking(move || {
        LocalWhisperBackend::new(&model_path, None, allowed)
            .map(|b| Arc::new(b) as Arc<dyn AsrBackend>)
            .map_err(|e| AsrError::Backend(e.to_string()))
    })
    .await
    .map_err(|e| AsrError::Backend(e.to_string()))?
}

#[cfg(all(not(feature = "local-whisper"), feature = "remote-asr"))]
pub async fn build(settings: &Settings) -> Result<Arc<dyn AsrBackend>, AsrError> {
    use memoire_transcription::asr::remote::RemoteAsrBackend;

    RemoteAsrBackend::new(
        settings.asr_model_path.clone(),
        Duration::from_secs(30),
        settings.allowed_languages.clone(),
    )
    .map(|b| Arc::new(b) as Arc<dyn AsrBackend>)
    .map_err(|e| AsrError::Backend(e.to_string()))
}

#[cfg(not(any(feature = "local-whisper", feature = "remote-asr")))]
pub async fn build(_settings: &Settings) -> Result<Arc<dyn AsrBackend>, AsrError> {
    Err(AsrError::Backend(
        "no ASR backend compiled in — enable the local-whisper or remote-asr feature".into(),
    ))
}
