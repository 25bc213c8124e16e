/// Liveness classifier using ONNX Runtime via `ort`.
///
/// The model is a binary classifier over a single face image: one NHWC
/// input, one output whose first element is P(live).
use std::path::Path;

use ndarray::Array4;

use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::shared::constants::LIVENESS_INPUT_SIZE;

/// Liveness classifier backed by an ONNX Runtime session.
///
/// Loading is the one fallible, long-latency step; afterwards the session is
/// reused read-only by every `classify` call.
pub struct OnnxLivenessClassifier {
    session: ort::session::Session,
    input_size: (u32, u32),
}

impl OnnxLivenessClassifier {
    /// Load a liveness ONNX model.
    ///
    /// The input resolution is read from the model's declared input shape
    /// (expecting NHWC `[1, H, W, 3]`); dynamic or unreadable dims fall back
    /// to 128×128.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // shape is [N, H, W, C] — static H and W required
                    if shape.len() >= 4 && shape[1] > 0 && shape[2] > 0 {
                        Some((shape[2] as u32, shape[1] as u32))
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or((LIVENESS_INPUT_SIZE, LIVENESS_INPUT_SIZE));

        Ok(Self {
            session,
            input_size,
        })
    }
}

impl LivenessClassifier for OnnxLivenessClassifier {
    fn classify(&mut self, input: Array4<f32>) -> Result<f32, Box<dyn std::error::Error>> {
        check_input_shape(input.shape(), self.input_size)?;

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() < 1 {
            return Err("liveness model produced no outputs".into());
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let probability = scores
            .iter()
            .next()
            .copied()
            .ok_or("liveness model produced an empty output tensor")?;

        Ok(probability)
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}

/// The tensor handed to the session must match the shape the model declared;
/// a mismatch here is a caller bug, caught before ONNX Runtime turns it into
/// an opaque runtime error.
fn check_input_shape(shape: &[usize], input_size: (u32, u32)) -> Result<(), String> {
    let (w, h) = input_size;
    let expected = [1, h as usize, w as usize, 3];
    if shape != expected {
        return Err(format!(
            "liveness input shape {shape:?} does not match model input {expected:?}"
        ));
    }
    Ok(())
}
