use crate::shared::frame::Frame;

/// Domain interface for the display surface of the continuous mode.
///
/// Receives one fully composited frame (current capture + overlay) per
/// cycle. Implementations own presentation details — files, windows,
/// encoders.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
