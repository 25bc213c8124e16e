use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face localization.
///
/// Any model family that maps a raster frame to zero or more boxes satisfies
/// the contract. The input frame is never mutated. Finding no face is a
/// normal empty result, not an error; only inference failures return `Err`.
/// Implementations may keep internal state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
