//! Capture client (spec.md §4.1/§4.2): owns the microphone, runs the
//! `Segmenter` from `memoire-transcription`, and drains a durable local
//! upload queue to the ingestion server over a WebSocket connection.

pub mod capture;
pub mod client;
pub mod config;
pub mod network;
pub mod queue;

pub use config::ClientConfig;
pub use network::{AlwaysOnline, NetworkMonitor};
pub use queue::{PendingUpload, UploadQueue, UploadStatus};
