pub const LIVENESS_MODEL_NAME: &str = "liveness_mnv2_128.onnx";
pub const LIVENESS_MODEL_URL: &str =
    "https://github.com/livegate/models/releases/download/v0.1.0/liveness_mnv2_128.onnx";

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const BLAZEFACE_MODEL_URL: &str =
    "https://github.com/livegate/models/releases/download/v0.1.0/blazeface_short_range.onnx";

/// Fallback classifier input resolution when the model declares dynamic dims.
pub const LIVENESS_INPUT_SIZE: u32 = 128;

/// Probability cutoff separating a live face from a spoof.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Period of one continuous detect-and-draw cycle.
pub const DEFAULT_WATCH_PERIOD_MS: u64 = 100;

/// Capture geometry requested from a camera device.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 600;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 400;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
