use ndarray::Array4;

/// Domain interface for the liveness classifier.
///
/// Input is a preprocessed `[1, H, W, 3]` tensor; output is the model's raw
/// probability that the imaged face is live, with no calibration applied.
/// The loaded model behind an implementation never changes after load;
/// `&mut self` covers only runtime scratch state, so a classifier is safe to
/// reuse across cycles for the lifetime of the session.
pub trait LivenessClassifier: Send {
    fn classify(&mut self, input: Array4<f32>) -> Result<f32, Box<dyn std::error::Error>>;

    /// Input resolution `(width, height)` the loaded model declares.
    fn input_size(&self) -> (u32, u32);
}
