use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for drawing detection overlays onto a frame.
///
/// Implementations modify the frame in place. Callers hand in a fresh copy
/// of the current frame every cycle, which is what guarantees overlays from
/// a previous cycle can never leak into the next render.
pub trait OverlayRenderer: Send {
    fn draw(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;
}
