//! Frame-level VAD (spec.md §4.1): a pluggable per-frame speech/non-speech
//! classifier behind `FrameVad`. `EnergyFrameVad` is the zero-dependency
//! default; `silero` (feature-gated) swaps in a neural classifier without
//! touching the `Segmenter` contract.

#[cfg(feature = "vad")]
pub mod silero;

/// 20 ms at 16 kHz, spec.md §4.1.
pub const FRAME_SAMPLES: usize = 320;

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("VAD initialization failed: {0}")]
    Init(String),
}

/// Per-frame speech/non-speech classifier. Spec.md §4.1: "VAD
/// initialization failure is fatal" — that's `new()`/constructor-time,
/// not this trait; once constructed, classification cannot fail.
pub trait FrameVad: Send {
    fn is_speech(&mut self, frame: &[i16]) -> bool;
}

/// RMS-energy threshold classifier. `aggressiveness` follows the 0
/// (permissive) – 3 (strict) scale spec.md §6 names for `vad_aggressiveness`,
/// mapped to a noise floor on 16-bit PCM amplitude.
pub struct EnergyFrameVad {
    threshold: f64,
}

impl EnergyFrameVad {
    pub fn new(aggressiveness: u8) -> Self {
        let threshold = match aggressiveness.min(3) {
            0 => 150.0,
            1 => 300.0,
            2 => 500.0,
            _ => 800.0,
        };
        Self { threshold }
    }
}

impl FrameVad for EnergyFrameVad {
    fn is_speech(&mut self, frame: &[i16]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let mean_sq = frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / frame.len() as f64;
        mean_sq.sqrt() >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_frame() -> Vec<i16> {
        vec![0; FRAME_SAMPLES]
    }

    fn loud_frame() -> Vec<i16> {
        (0..FRAME_SAMPLES)
            .map(|i| {
                let t = i as f64 / 16_000.0;
                ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 20_000.0) as i16
            })
            .collect()
    }

    #[test]
    fn silence_is_not_speech() {
        let mut vad = EnergyFrameVad::new(2);
        assert!(!vad.is_speech(&silent_frame()));
    }

    #[test]
    fn loud_tone_is_speech() {
        let mut vad = EnergyFrameVad::new(2);
        assert!(vad.is_speech(&loud_frame()));
    }

    #[test]
    fn higher_aggressiveness_raises_the_bar() {
        let mut lenient = EnergyFrameVad::new(0);
        let mut strict = EnergyFrameVad::new(3);
        // A moderately loud frame clears the lenient threshold but not
        // necessarily the strict one.
        let frame: Vec<i16> = (0..FRAME_SAMPLES)
            .map(|i| {
                let t = i as f64 / 16_000.0;
                ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 250.0) as i16
            })
            .collect();
        assert!(lenient.is_speech(&frame));
        assert!(!strict.is_speech(&frame));
    }
}
