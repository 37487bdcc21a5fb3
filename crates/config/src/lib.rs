//! The flat configuration record enumerated in spec.md §6, loaded from
//! layered sources (defaults → `config/{env}.toml` → `APP__*` env vars).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreAsrMethod {
    FftBandRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyMode {
    Strict,
    Mask,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionAction {
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRule {
    pub table: String,
    pub age_days: i64,
    pub action: RetentionAction,
}

/// One flat record enumerating every knob in spec.md §6. No dynamic
/// attribute access — every caller reaches a field by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingestion_port: u16,
    pub bearer_token: String,
    pub allowed_languages: Vec<String>,
    pub language_probability_threshold: f64,
    pub vad_aggressiveness: u8,
    pub min_segment_duration_secs: f64,
    pub silence_duration_to_end_ms: u64,
    pub max_payload_bytes: usize,
    pub pre_asr_filter_enabled: bool,
    pub pre_asr_filter_method: PreAsrMethod,
    pub noise_phrases: Vec<String>,
    pub hallucination_phrases: Vec<String>,
    pub privacy_mode: PrivacyMode,
    pub enrichment_model_id: String,
    pub enrichment_retry_count: u8,
    pub enrichment_backoff_schedule_secs: Vec<u64>,
    pub retention_rules: Vec<RetentionRule>,
    pub database_url: String,
    pub staging_dir: PathBuf,
    /// Local Whisper model file (`local-whisper` feature) or remote ASR
    /// endpoint URL (`remote-asr` feature) — the §6 knob list names the
    /// ASR adapter as pluggable without naming how a deployment points
    /// at a concrete model/service; this fills that gap.
    pub asr_model_path: String,
    /// LLM enrichment endpoint URL (§4.9's "out-of-band LLM call");
    /// same gap as `asr_model_path` for the enrichment backend.
    pub enrichment_endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ingestion_port: 8080,
            bearer_token: String::new(),
            allowed_languages: vec!["ru".into(), "kk".into(), "en".into()],
            language_probability_threshold: 0.4,
            vad_aggressiveness: 2,
            min_segment_duration_secs: 0.5,
            silence_duration_to_end_ms: 300,
            max_payload_bytes: 25 * 1024 * 1024,
            pre_asr_filter_enabled: true,
            pre_asr_filter_method: PreAsrMethod::FftBandRatio,
            noise_phrases: default_noise_phrases(),
            hallucination_phrases: default_hallucination_phrases(),
            privacy_mode: PrivacyMode::Mask,
            enrichment_model_id: "default".into(),
            enrichment_retry_count: 3,
            enrichment_backoff_schedule_secs: vec![2, 4, 8],
            retention_rules: Vec::new(),
            database_url: "postgres://localhost/memoire".into(),
            staging_dir: PathBuf::from("/tmp/memoire/staging"),
            asr_model_path: "models/ggml-base.bin".into(),
            enrichment_endpoint: "http://localhost:9000/enrich".into(),
        }
    }
}

pub fn default_noise_phrases() -> Vec<String> {
    [
        "угу", "ага", "ну", "мм", "это", "ладно", "понял", "окей",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_hallucination_phrases() -> Vec<String> {
    ["спасибо.", "подписывайтесь."]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Settings {
    /// Layers defaults → `config/default.toml` → `config/{RUN_ENV}.toml` →
    /// `APP__*` environment overrides into one record. The file layer is
    /// optional at every level (a bare-env deployment is valid).
    pub fn load() -> Result<Self, ConfigError> {
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let defaults = config::Config::try_from(&Settings::default())?;

        let builder = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let settings = builder.build()?;
        settings.try_deserialize().map_err(ConfigError::from)
    }
}
