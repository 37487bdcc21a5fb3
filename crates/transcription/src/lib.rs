//! Client-side segmentation and the pluggable ASR adapter (spec.md
//! §4.1/§4.5): frame-level VAD → bounded speech segments, and a
//! singleton-per-process backend that turns a segment into text.

pub mod asr;
pub mod segmenter;
pub mod vad;
pub mod wav;

pub use asr::singleton::AsrSingleton;
pub use asr::{AsrBackend, AsrError, AsrRequest, AsrResult, AsrSpan};
pub use segmenter::{EmittedSegment, Segmenter};
pub use vad::{EnergyFrameVad, FrameVad};
