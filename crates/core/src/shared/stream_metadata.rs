/// Properties of an opened frame stream, reported by the source on open.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0.0 for still-image sources.
    pub fps: f64,
    /// Human-readable description of the device or file backing the stream.
    pub source: String,
}
