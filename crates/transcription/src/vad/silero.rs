//! Silero VAD via ONNX Runtime, an alternative `FrameVad` for
//! deployments that want a neural classifier instead of the energy
//! default (spec.md §4.1's "external VAD with configurable
//! aggressiveness" is satisfied by either backend behind the same
//! trait).

use ndarray::{Array, IxDyn};
use ort::session::Session;
use ort::value::Value;

use super::{FrameVad, VadError};

pub struct SileroFrameVad {
    session: Session,
    threshold: f32,
    /// Silero's recurrent state, carried frame-to-frame.
    h: Vec<f32>,
    c: Vec<f32>,
}

const STATE_DIM: usize = 2 * 1 * 64;

impl SileroFrameVad {
    pub fn new(model_path: &str, aggressiveness: u8) -> Result<Self, VadError> {
        let session = Session::builder()
            .map_err(|e| VadError::Init(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| VadError::Init(format!("failed to load Silero model '{model_path}': {e}")))?;

        // Aggressiveness 0-3 maps to a speech-probability threshold; higher
        // aggressiveness demands more confidence before calling a frame speech.
        let threshold = match aggressiveness.min(3) {
            0 => 0.3,
            1 => 0.5,
            2 => 0.65,
            _ => 0.8,
        };

        Ok(Self {
            session,
            threshold,
            h: vec![0.0; STATE_DIM],
            c: vec![0.0; STATE_DIM],
        })
    }
}

impl FrameVad for SileroFrameVad {
    fn is_speech(&mut self, frame: &[i16]) -> bool {
        let samples: Vec<f32> = frame.iter().map(|&s| s as f32 / i16::MAX as f32).collect();

        let input = match Array::from_shape_vec(IxDyn(&[1, samples.len()]), samples) {
            Ok(a) => a,
            Err(_) => return false,
        };
        let h_in = Array::from_shape_vec(IxDyn(&[2, 1, 64]), self.h.clone()).unwrap();
        let c_in = Array::from_shape_vec(IxDyn(&[2, 1, 64]), self.c.clone()).unwrap();
        let sr = Array::from_vec(vec![16_000i64]);

        let Ok(input_value) = Value::from_array(input) else { return false };
        let Ok(sr_value) = Value::from_array(sr) else { return false };
        let Ok(h_value) = Value::from_array(h_in) else { return false };
        let Ok(c_value) = Value::from_array(c_in) else { return false };

        let outputs = match self.session.run(ort::inputs![
            "input" => input_value,
            "sr" => sr_value,
            "h" => h_value,
            "c" => c_value,
        ]) {
            Ok(o) => o,
            Err(_) => return false,
        };

        let prob: f32 = outputs
            .get("output")
            .and_then(|v| v.try_extract_tensor::<f32>().ok())
            .and_then(|(_, data)| data.first().copied())
            .unwrap_or(0.0);

        if let Some((_, h_out)) = outputs.get("hn").and_then(|v| v.try_extract_tensor::<f32>().ok()) {
            self.h = h_out.to_vec();
        }
        if let Some((_, c_out)) = outputs.get("cn").and_then(|v| v.try_extract_tensor::<f32>().ok()) {
            self.c = c_out.to_vec();
        }

        prob >= self.threshold
    }
}
