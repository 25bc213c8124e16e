use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Domain interface for a live or replayed frame stream.
///
/// The pipeline pulls a snapshot of the most recent decodable frame each
/// cycle; it never awaits the device's own delivery rate. `Ok(None)` means
/// the source has nothing to offer right now — still warming up, or drained
/// — and is a valid state distinct from `Err` (device lost, decode failure).
/// Calling `current_frame` before `open` is an error, not a stale frame.
pub trait FrameSource: Send {
    /// Starts the stream and reports its geometry.
    fn open(&mut self) -> Result<StreamMetadata, Box<dyn std::error::Error>>;

    /// Pulls the most recent decoded frame, if any.
    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Whether the stream can still produce frames.
    fn is_active(&self) -> bool;

    /// Releases device and codec resources.
    fn close(&mut self);
}
