use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::render::domain::frame_sink::FrameSink;
use crate::render::domain::overlay_renderer::OverlayRenderer;

/// Counters describing a finished watch run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Cycles attempted (including skipped and failed ones).
    pub cycles: usize,
    /// Cycles whose composited frame reached the sink.
    pub frames_rendered: usize,
    /// Cycles in which the detector reported at least one face.
    pub cycles_with_faces: usize,
    /// Cycles swallowed at the cycle boundary (detector/renderer/sink).
    pub cycle_errors: usize,
}

/// Continuous detect-and-draw loop.
///
/// Runs one cycle per period for as long as the source stays active: pull
/// frame → detect → compose overlay on a fresh copy of the frame → present.
/// The cycle body is re-invoked every tick and each cycle completes before
/// the next sleep begins, so cycles never overlap or queue up.
///
/// Per-cycle failures (detector, renderer, sink) are logged and swallowed at
/// the cycle boundary — one bad frame never halts the loop. Losing the
/// device itself does stop the run. Cancellation is checked between cycles
/// and again before presenting, so a cycle finishing after teardown quietly
/// discards its output.
pub struct WatchFacesUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    renderer: Box<dyn OverlayRenderer>,
    sink: Box<dyn FrameSink>,
    logger: Box<dyn PipelineLogger>,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    max_cycles: Option<usize>,
}

impl WatchFacesUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        renderer: Box<dyn OverlayRenderer>,
        sink: Box<dyn FrameSink>,
        logger: Box<dyn PipelineLogger>,
        period: Duration,
        cancelled: Arc<AtomicBool>,
        max_cycles: Option<usize>,
    ) -> Self {
        Self {
            source,
            detector,
            renderer,
            sink,
            logger,
            period,
            cancelled,
            max_cycles,
        }
    }

    pub fn execute(&mut self) -> Result<WatchSummary, Box<dyn std::error::Error>> {
        let mut summary = WatchSummary::default();

        while self.source.is_active() && !self.cancelled.load(Ordering::Relaxed) {
            if let Some(max) = self.max_cycles {
                if summary.cycles >= max {
                    break;
                }
            }

            let tick = Instant::now();
            if let Err(e) = self.run_cycle(&mut summary) {
                self.source.close();
                self.logger.summary();
                return Err(e);
            }
            summary.cycles += 1;
            self.logger.cycle_completed(summary.cycles);

            if let Some(rest) = self.period.checked_sub(tick.elapsed()) {
                if !rest.is_zero() {
                    std::thread::sleep(rest);
                }
            }
        }

        self.source.close();
        self.logger.summary();
        Ok(summary)
    }

    /// One detect-and-draw cycle. `Err` is reserved for device loss; every
    /// other failure increments `cycle_errors` and returns `Ok`.
    fn run_cycle(&mut self, summary: &mut WatchSummary) -> Result<(), Box<dyn std::error::Error>> {
        let frame = match self.source.current_frame() {
            Ok(Some(frame)) => frame,
            // Nothing to show this tick; the next cycle pulls again.
            Ok(None) => return Ok(()),
            Err(e) => return Err(e),
        };

        let detect_start = Instant::now();
        let regions = match self.detector.detect(&frame) {
            Ok(regions) => regions,
            Err(e) => {
                summary.cycle_errors += 1;
                log::warn!("detection failed on cycle {}: {e}", frame.cycle());
                return Ok(());
            }
        };
        self.logger
            .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", regions.len() as f64);
        if !regions.is_empty() {
            summary.cycles_with_faces += 1;
        }

        // Compose on a fresh copy of the current frame. The previous cycle's
        // overlay exists only in the sink's last output, so an empty result
        // here presents a clean frame.
        let mut canvas = frame.clone();
        let render_start = Instant::now();
        if let Err(e) = self.renderer.draw(&mut canvas, &regions) {
            summary.cycle_errors += 1;
            log::warn!("overlay render failed on cycle {}: {e}", frame.cycle());
            return Ok(());
        }

        if self.cancelled.load(Ordering::Relaxed) {
            // Torn down while composing; the render target may be gone.
            return Ok(());
        }
        if let Err(e) = self.sink.write(&canvas) {
            summary.cycle_errors += 1;
            log::warn!("presenting cycle {} failed: {e}", frame.cycle());
            return Ok(());
        }
        self.logger
            .timing("render", render_start.elapsed().as_secs_f64() * 1000.0);
        summary.frames_rendered += 1;

        Ok(())
    }
}
