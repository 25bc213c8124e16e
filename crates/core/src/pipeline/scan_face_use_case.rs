use std::cmp::Ordering;

use crate::capture::domain::frame_source::FrameSource;
use crate::liveness::domain::decision::{decide, Verdict};
use crate::liveness::domain::preprocess::preprocess;
use crate::pipeline::session::{LoadedModels, SessionError};
use crate::render::domain::label_sink::LabelSink;
use crate::shared::region::Region;

/// One on-demand cycle: pull frame → optional best-face crop → preprocess →
/// classify → decide → publish.
///
/// The stages run strictly in that order within a cycle; nothing produced
/// here outlives the call. Session-state gating lives in
/// [`crate::pipeline::session::LivenessSession`] — this type assumes the
/// models are already loaded.
pub struct ScanFaceUseCase {
    threshold: f32,
}

impl ScanFaceUseCase {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn execute(
        &self,
        models: &mut LoadedModels,
        source: &mut dyn FrameSource,
        sink: &mut dyn LabelSink,
    ) -> Result<Verdict, SessionError> {
        let frame = source
            .current_frame()
            .map_err(|e| SessionError::Device(e.to_string()))?
            .ok_or(SessionError::FrameNotReady)?;

        // Classify the most confident face when a detector is present; an
        // empty detection is a normal result and falls back to the whole
        // frame rather than failing the cycle.
        let crop = match models.detector.as_mut() {
            Some(detector) => {
                let regions = detector
                    .detect(&frame)
                    .map_err(|e| SessionError::Detect(e.to_string()))?;
                best_face(regions)
            }
            None => None,
        };

        let input = preprocess(&frame, models.classifier.input_size(), crop.as_ref());
        let probability = models
            .classifier
            .classify(input)
            .map_err(|e| SessionError::Classify(e.to_string()))?;

        let verdict = decide(probability, self.threshold)?;
        log::debug!("scan: probability {probability:.3} -> {verdict}");
        sink.publish(verdict);
        Ok(verdict)
    }
}

/// Highest-confidence face wins; `None` when the detector found nothing.
fn best_face(regions: Vec<Region>) -> Option<Region> {
    regions.into_iter().max_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(Ordering::Equal)
    })
}
