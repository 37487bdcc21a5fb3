//! In-memory WAV payload builders for exercising the ingress pipeline
//! without recording real audio.

use std::io::Cursor;

const SAMPLE_RATE: u32 = 16_000;

fn encode(samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("valid wav spec");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Several harmonics inside the 300-3400 Hz speech band, summed — close
/// enough to a voiced utterance to pass the pre-ASR energy-band gate.
pub fn speech_like_wav(duration_secs: f64) -> Vec<u8> {
    let n = (SAMPLE_RATE as f64 * duration_secs) as usize;
    let samples: Vec<i16> = (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            let mut v = 0.0;
            for freq in [400.0, 900.0, 1800.0, 2600.0] {
                v += (2.0 * std::f64::consts::PI * freq * t).sin();
            }
            (v / 4.0 * i16::MAX as f64 * 0.6) as i16
        })
        .collect();
    encode(&samples)
}

/// A pure tone well above the speech band — the pre-ASR gate's "music"
/// rejection case.
pub fn tone_wav(freq: f64, duration_secs: f64) -> Vec<u8> {
    let n = (SAMPLE_RATE as f64 * duration_secs) as usize;
    let samples: Vec<i16> = (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            ((2.0 * std::f64::consts::PI * freq * t).sin() * i16::MAX as f64 * 0.5) as i16
        })
        .collect();
    encode(&samples)
}
