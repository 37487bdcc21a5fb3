//! Two gates bracketing ASR (spec.md §4.4): a pre-ASR speech-vs-noise
//! FFT gate, and a post-ASR meaningfulness gate. Both are pure
//! functions — no I/O, no shared state — in the teacher's
//! validator-as-pure-function style (`validator` crate usage across the
//! DAO layer).

use std::sync::Arc;

use rustfft::{FftPlanner, num_complex::Complex};

/// Why a segment or transcription was rejected. The `code()` string is
/// the wire `reason` field in the `filtered` terminal message
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    Music,
    WordCount,
    Language,
    NoisePhrase,
    HallucinationPhrase,
    PiiBlocked,
}

impl FilterReason {
    pub fn code(&self) -> &'static str {
        match self {
            FilterReason::Music => "music",
            FilterReason::WordCount => "word_count",
            FilterReason::Language => "language",
            FilterReason::NoisePhrase => "noise_phrase",
            FilterReason::HallucinationPhrase => "hallucination_phrase",
            FilterReason::PiiBlocked => "pii_blocked",
        }
    }
}

/// The human-speech energy band, spec.md §4.4.
const SPEECH_BAND_LOW_HZ: f64 = 300.0;
const SPEECH_BAND_HIGH_HZ: f64 = 3400.0;

/// A broadband/music signal puts most of its energy outside the speech
/// band; reject when less than this fraction of total energy falls
/// inside it.
const MIN_IN_BAND_ENERGY_RATIO: f64 = 0.35;

/// Pre-ASR gate: rejects pure-tone/music/broadband-noise payloads by
/// FFT energy-band ratio (spec.md §4.4, S2/property 5).
pub struct PreAsrGate {
    enabled: bool,
}

impl PreAsrGate {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// `samples` is PCM16 mono at `sample_rate` Hz. Returns `Some(reason)`
    /// if the pipeline should terminate with `filtered`.
    pub fn check(&self, samples: &[i16], sample_rate: u32) -> Option<FilterReason> {
        if !self.enabled || samples.is_empty() {
            return None;
        }

        let ratio = in_band_energy_ratio(samples, sample_rate);
        if ratio < MIN_IN_BAND_ENERGY_RATIO {
            Some(FilterReason::Music)
        } else {
            None
        }
    }
}

fn in_band_energy_ratio(samples: &[i16], sample_rate: u32) -> f64 {
    let n = samples.len().next_power_of_two();
    let mut buf: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s as f64 / i16::MAX as f64, 0.0))
        .collect();
    buf.resize(n, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buf);

    let bin_hz = sample_rate as f64 / n as f64;
    let half = n / 2;

    let mut total_energy = 0.0;
    let mut in_band_energy = 0.0;
    for (i, c) in buf.iter().take(half).enumerate() {
        let freq = i as f64 * bin_hz;
        let energy = c.norm_sqr();
        total_energy += energy;
        if freq >= SPEECH_BAND_LOW_HZ && freq <= SPEECH_BAND_HIGH_HZ {
            in_band_energy += energy;
        }
    }

    if total_energy <= f64::EPSILON {
        return 0.0;
    }
    in_band_energy / total_energy
}

/// Post-ASR meaningfulness gate (spec.md §4.4): word count, language
/// allowlist + probability, noise/hallucination phrase blocklists.
pub struct PostAsrGate {
    allowed_languages: Arc<[String]>,
    language_probability_threshold: f64,
    noise_phrases: Arc<[String]>,
    hallucination_phrases: Arc<[String]>,
}

impl PostAsrGate {
    pub fn new(
        allowed_languages: Vec<String>,
        language_probability_threshold: f64,
        noise_phrases: Vec<String>,
        hallucination_phrases: Vec<String>,
    ) -> Self {
        Self {
            allowed_languages: allowed_languages.into(),
            language_probability_threshold,
            noise_phrases: noise_phrases.into(),
            hallucination_phrases: hallucination_phrases.into(),
        }
    }

    pub fn check(
        &self,
        text: &str,
        detected_language: &str,
        language_probability: f64,
    ) -> Option<FilterReason> {
        // Phrase matches are checked ahead of the generic word-count
        // gate: a one-word filler like "Угу." is also short enough to
        // trip the word-count rule, but spec.md §8 S3 expects the more
        // specific `noise_phrase` reason for it.
        let normalized = normalize(text);
        if self.noise_phrases.iter().any(|p| normalize(p) == normalized) {
            return Some(FilterReason::NoisePhrase);
        }
        if self
            .hallucination_phrases
            .iter()
            .any(|p| normalize(p) == normalized)
        {
            return Some(FilterReason::HallucinationPhrase);
        }

        let word_count = text.split_whitespace().count();
        if word_count < 3 {
            return Some(FilterReason::WordCount);
        }

        let language_ok = self
            .allowed_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(detected_language));
        if !language_ok || language_probability < self.language_probability_threshold {
            return Some(FilterReason::Language);
        }

        None
    }
}

/// Lowercase + strip punctuation, per spec.md §4.4's normalization rule.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '.' && *c != ',')
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}
