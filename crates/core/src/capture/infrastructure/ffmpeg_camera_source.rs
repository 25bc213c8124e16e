use std::path::PathBuf;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::{DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH};
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

use super::ffmpeg_file_source::extract_rgb_pixels;

/// Requested capture geometry for a camera device. Audio is never requested;
/// only the best video stream of the device is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
        }
    }
}

/// Live capture device (V4L2 and friends) adapted to [`FrameSource`].
///
/// The device delivers frames at its native rate; each `current_frame` call
/// pulls and decodes the next delivered frame as the stream snapshot. A
/// device that disappears mid-stream surfaces as an error, never as a stale
/// or garbage frame.
pub struct FfmpegCameraSource {
    device: PathBuf,
    config: CameraConfig,
    stream: Option<OpenDevice>,
    cycle: usize,
    active: bool,
}

struct OpenDevice {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: the source is only driven from one thread at a time; the raw
// pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn new(device: impl Into<PathBuf>, config: CameraConfig) -> Self {
        Self {
            device: device.into(),
            config,
            stream: None,
            cycle: 0,
            active: false,
        }
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<StreamMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", self.config.width, self.config.height),
        );

        let ictx = ffmpeg_next::format::input_with_dictionary(&self.device, options)
            .map_err(|e| format!("cannot open capture device {}: {e}", self.device.display()))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("capture device exposes no video stream")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        // The device may not honor the requested geometry exactly; the
        // stream's own dimensions are authoritative.
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "camera {} opened at {width}x{height} @ {fps:.1} fps",
            self.device.display()
        );

        let metadata = StreamMetadata {
            width,
            height,
            fps,
            source: self.device.display().to_string(),
        };

        self.stream = Some(OpenDevice {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        self.cycle = 0;
        self.active = true;

        Ok(metadata)
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or("FfmpegCameraSource: not opened")?;
        if !self.active {
            return Ok(None);
        }

        match stream.pull(self.cycle) {
            Ok(Some(frame)) => {
                self.cycle += 1;
                Ok(Some(frame))
            }
            Ok(None) => {
                // Device delivered nothing decodable; treat as "no frame yet".
                Ok(None)
            }
            Err(e) => {
                self.active = false;
                Err(e)
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        self.stream = None;
        self.active = false;
    }
}

impl OpenDevice {
    fn pull(&mut self, cycle: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive(cycle)? {
                return Ok(Some(frame));
            }

            let Some((stream, packet)) = self.ictx.packets().next() else {
                // A live device running out of packets means the stream
                // ended underneath us (unplugged, permission revoked).
                return Err("capture device stopped delivering frames".into());
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                // Corrupt packet from the device; skip and keep pulling.
                continue;
            }
        }
    }

    fn try_receive(&mut self, cycle: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, cycle)))
    }
}
