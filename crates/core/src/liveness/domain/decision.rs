use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DecisionError {
    #[error("probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f32),
    #[error("threshold {0} is outside (0, 1)")]
    ThresholdOutOfRange(f32),
}

/// Outcome of one liveness decision.
///
/// A closed two-variant type rather than a label string, so every consumer
/// is forced to handle both outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    RealFace,
    FakeFace,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::RealFace => write!(f, "Real Face"),
            Verdict::FakeFace => write!(f, "Fake Face"),
        }
    }
}

/// Thresholds a classifier probability into a [`Verdict`].
///
/// Strictly greater-than: the boundary probability is not accepted as live.
/// A probability outside [0,1] (or non-finite) is a contract violation by
/// the classifier and is rejected rather than clamped.
pub fn decide(probability: f32, threshold: f32) -> Result<Verdict, DecisionError> {
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(DecisionError::ProbabilityOutOfRange(probability));
    }
    if !threshold.is_finite() || threshold <= 0.0 || threshold >= 1.0 {
        return Err(DecisionError::ThresholdOutOfRange(threshold));
    }
    if probability > threshold {
        Ok(Verdict::RealFace)
    } else {
        Ok(Verdict::FakeFace)
    }
}
