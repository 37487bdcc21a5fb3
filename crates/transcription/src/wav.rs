//! WAV container helpers (spec.md §4.1/§6): writing the 44-byte RIFF
//! header emitted by the segmenter, and validating the magic bytes the
//! ingress endpoint checks first.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Writes `samples` as a little-endian PCM16 mono WAV at `sample_rate`
/// (spec.md §4.1: "standard 44-byte RIFF header").
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()
}

/// Reads a mono PCM16 WAV file back into samples plus its declared
/// sample rate.
pub fn read_wav(path: &Path) -> Result<(Vec<i16>, u32), hound::Error> {
    let mut reader = WavReader::open(path)?;
    let sample_rate = reader.spec().sample_rate;
    let samples = reader.samples::<i16>().collect::<Result<Vec<i16>, _>>()?;
    Ok((samples, sample_rate))
}

/// Parses a WAV byte buffer the same way `read_wav` parses a file,
/// for the ingress path where the payload arrives over the wire rather
/// than already on disk.
pub fn read_wav_bytes(bytes: &[u8]) -> Result<(Vec<i16>, u32), hound::Error> {
    let cursor = std::io::Cursor::new(bytes);
    let mut reader = WavReader::new(cursor)?;
    let sample_rate = reader.spec().sample_rate;
    let samples = reader.samples::<i16>().collect::<Result<Vec<i16>, _>>()?;
    Ok((samples, sample_rate))
}

/// Validates the `RIFF....WAVE` magic bytes (spec.md §4.3 step 1)
/// without fully parsing the container — the cheap first check before
/// handing the payload to `hound`.
pub fn has_wav_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.wav");
        let samples: Vec<i16> = (0..1600).map(|i| (i % 100) as i16).collect();
        write_wav(&path, &samples, 16_000).unwrap();

        let (read_back, sample_rate) = read_wav(&path).unwrap();
        assert_eq!(sample_rate, 16_000);
        assert_eq!(read_back, samples);
    }

    #[test]
    fn magic_bytes_reject_non_wav() {
        assert!(!has_wav_magic(b"not a wav file at all"));
        assert!(has_wav_magic(b"RIFF\x00\x00\x00\x00WAVEfmt "));
    }
}
