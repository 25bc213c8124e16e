use std::path::PathBuf;

use crate::render::domain::frame_sink::FrameSink;
use crate::shared::frame::Frame;

/// Writes each composited frame as a numbered PNG in a directory.
///
/// File names follow the frame's cycle index, so a directory listing replays
/// the watch session in order.
pub struct ImageFileSink {
    dir: PathBuf,
}

impl ImageFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FrameSink for ImageFileSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.dir)?;

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let path = self.dir.join(format!("cycle_{:06}.png", frame.cycle()));
        img.save(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, value: u8, cycle: usize) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, cycle)
    }

    #[test]
    fn test_write_creates_numbered_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path());
        sink.write(&make_frame(32, 24, 120, 7)).unwrap();

        let path = dir.path().join("cycle_000007.png");
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_successive_cycles_become_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path());
        sink.write(&make_frame(16, 16, 10, 0)).unwrap();
        sink.write(&make_frame(16, 16, 20, 1)).unwrap();

        assert!(dir.path().join("cycle_000000.png").exists());
        assert!(dir.path().join("cycle_000001.png").exists());
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path());
        sink.write(&make_frame(8, 8, 99, 3)).unwrap();

        let reloaded = image::open(dir.path().join("cycle_000003.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(reloaded.dimensions(), (8, 8));
        assert!(reloaded.pixels().all(|p| p.0 == [99, 99, 99]));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut sink = ImageFileSink::new(&nested);
        sink.write(&make_frame(4, 4, 1, 0)).unwrap();
        assert!(nested.join("cycle_000000.png").exists());
    }
}
