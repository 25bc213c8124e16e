use std::path::PathBuf;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Still image adapted to the [`FrameSource`] contract.
///
/// The image is decoded once on open and served as the "most recent frame"
/// on every pull (fps = 0), which lets the on-demand scan run against a
/// saved capture exactly as it would against a live stream.
pub struct ImageFileSource {
    path: PathBuf,
    frame: Option<Frame>,
    cycle: usize,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
            cycle: 0,
        }
    }
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<StreamMetadata, Box<dyn std::error::Error>> {
        let img = image::open(&self.path)
            .map_err(|e| format!("cannot decode image {}: {e}", self.path.display()))?
            .to_rgb8();

        let (width, height) = img.dimensions();
        self.frame = Some(Frame::new(img.into_raw(), width, height, 0));
        self.cycle = 0;

        Ok(StreamMetadata {
            width,
            height,
            fps: 0.0,
            source: self.path.display().to_string(),
        })
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let frame = self.frame.as_ref().ok_or("ImageFileSource: not opened")?;
        let snapshot = Frame::new(
            frame.data().to_vec(),
            frame.width(),
            frame.height(),
            self.cycle,
        );
        self.cycle += 1;
        Ok(Some(snapshot))
    }

    fn is_active(&self) -> bool {
        self.frame.is_some()
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
