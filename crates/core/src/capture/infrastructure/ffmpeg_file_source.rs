use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Video file adapted to the [`FrameSource`] contract via ffmpeg-next.
///
/// Frames are decoded on demand in decode order and converted to RGB24.
/// After the last frame has been pulled the source reports `Ok(None)` and
/// `is_active` turns false, ending a watch loop cleanly.
pub struct FfmpegFileSource {
    path: PathBuf,
    stream: Option<OpenStream>,
    cycle: usize,
    active: bool,
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
}

// Safety: the source is only driven from one thread at a time; the raw
// pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegFileSource {}

impl FfmpegFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
            cycle: 0,
            active: false,
        }
    }
}

impl FrameSource for FfmpegFileSource {
    fn open(&mut self) -> Result<StreamMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&self.path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

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

        let metadata = StreamMetadata {
            width,
            height,
            fps,
            source: self.path.display().to_string(),
        };

        self.stream = Some(OpenStream {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            flushing: false,
        });
        self.cycle = 0;
        self.active = true;

        Ok(metadata)
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or("FfmpegFileSource: not opened")?;
        if !self.active {
            return Ok(None);
        }

        match stream.next_frame(self.cycle)? {
            Some(frame) => {
                self.cycle += 1;
                Ok(Some(frame))
            }
            None => {
                self.active = false;
                Ok(None)
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

impl OpenStream {
    /// Decodes the next frame, driving the demuxer as needed.
    /// `Ok(None)` once the stream is fully drained.
    fn next_frame(&mut self, cycle: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive(cycle)? {
                return Ok(Some(frame));
            }
            if self.flushing {
                return Ok(None);
            }

            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                continue;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
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

/// Copies pixel data out of an ffmpeg frame into a tightly-packed RGB buffer,
/// stripping any per-row stride padding.
pub(crate) fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
