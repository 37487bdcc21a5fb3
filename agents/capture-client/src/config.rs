//! Client-side configuration. A much smaller flat record than
//! `memoire_config::Settings` (the server owns most of §6's knobs) —
//! this covers only what the client itself needs to decide: where the
//! microphone input comes from, where the local queue lives, and how
//! to reach the ingestion endpoint.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::Digest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `ws://host:port/ingest` (or `wss://...`).
    pub server_url: String,
    pub bearer_token: String,
    pub vad_aggressiveness: u8,
    /// Caps the number of `pending`/`failed` rows the local queue will
    /// hold before applying the backpressure policy (spec.md §5:
    /// "a policy parameter caps the queue size and oldest-drop may be
    /// applied").
    pub max_queue_size: usize,
    pub drop_oldest_on_overflow: bool,
    /// Directory for durable segment WAV files and the queue database;
    /// defaults to the OS data dir under `memoire/` (see `data_dir`).
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ingest".into(),
            bearer_token: String::new(),
            vad_aggressiveness: 2,
            max_queue_size: 500,
            drop_oldest_on_overflow: true,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Loads from `~/.config/memoire/client.toml` (via `directories`),
    /// falling back to defaults when the file is absent — a bare
    /// install should still run.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        if let Some(dirs) = directories::ProjectDirs::from("com", "memoire", "capture-client") {
            let path = dirs.config_dir().join("client.toml");
            if let Ok(raw) = std::fs::read_to_string(&path) {
                cfg = toml::from_str(&raw)?;
            }
            if cfg.data_dir.is_none() {
                cfg.data_dir = Some(dirs.data_dir().to_path_buf());
            }
        }
        Ok(cfg)
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("memoire-capture-client"))
    }
}

/// A stable per-install device id, derived once and cached on disk
/// (`device_id`) rather than recomputed from volatile host state every
/// run — used only to tag log lines and queue diagnostics, never sent
/// to the server (segment ids are client-generated UUIDs, spec.md §3).
pub fn device_id(data_dir: &PathBuf) -> String {
    let marker = data_dir.join("device_id");
    if let Ok(existing) = std::fs::read_to_string(&marker) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let seed = format!(
        "{}-{}",
        whoami_hostname(),
        uuid::Uuid::new_v4()
    );
    let digest = sha2::Sha256::digest(seed.as_bytes());
    let id = hex::encode(&digest[..8]);

    let _ = std::fs::create_dir_all(data_dir);
    let _ = std::fs::write(&marker, &id);
    id
}

fn whoami_hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let first = device_id(&path);
        let second = device_id(&path);
        assert_eq!(first, second);
    }
}
