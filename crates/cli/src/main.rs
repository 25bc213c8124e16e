use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use livegate_core::capture::domain::frame_source::FrameSource;
use livegate_core::capture::infrastructure::ffmpeg_camera_source::{
    CameraConfig, FfmpegCameraSource,
};
use livegate_core::capture::infrastructure::ffmpeg_file_source::FfmpegFileSource;
use livegate_core::capture::infrastructure::image_file_source::ImageFileSource;
use livegate_core::detection::domain::face_detector::FaceDetector;
use livegate_core::detection::infrastructure::onnx_blazeface_detector::{
    OnnxBlazefaceDetector, DEFAULT_CONFIDENCE,
};
use livegate_core::liveness::infrastructure::onnx_liveness_classifier::OnnxLivenessClassifier;
use livegate_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use livegate_core::pipeline::scan_face_use_case::ScanFaceUseCase;
use livegate_core::pipeline::session::{LivenessSession, LoadResult, LoadedModels, SessionState};
use livegate_core::pipeline::watch_faces_use_case::WatchFacesUseCase;
use livegate_core::render::domain::label_sink::LatestLabelSink;
use livegate_core::render::infrastructure::image_file_sink::ImageFileSink;
use livegate_core::render::infrastructure::rectangle_overlay::RectangleOverlay;
use livegate_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, BLAZEFACE_MODEL_URL, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_THRESHOLD, DEFAULT_WATCH_PERIOD_MS, IMAGE_EXTENSIONS, LIVENESS_MODEL_NAME,
    LIVENESS_MODEL_URL,
};
use livegate_core::shared::model_resolver;

/// Face liveness scanning and detection overlay for video streams.
#[derive(Parser)]
#[command(name = "livegate")]
struct Cli {
    /// Capture device (e.g. /dev/video0), video file, or still image.
    input: PathBuf,

    /// Run the continuous detect-and-draw loop instead of a single scan.
    #[arg(long)]
    watch: bool,

    /// Directory for annotated frames (required with --watch).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Liveness probability cutoff, exclusive (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Watch cycle period in milliseconds.
    #[arg(long, default_value_t = DEFAULT_WATCH_PERIOD_MS)]
    period_ms: u64,

    /// Stop watch mode after this many cycles.
    #[arg(long)]
    max_cycles: Option<usize>,

    /// Classify the whole frame instead of cropping to a detected face.
    #[arg(long)]
    no_crop: bool,

    /// Treat the input as a live capture device.
    #[arg(long)]
    camera: bool,

    /// Requested capture width (camera input only).
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    width: u32,

    /// Requested capture height (camera input only).
    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    height: u32,

    /// Local liveness model path, bypassing the cache/download resolver.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Local face detection model path, bypassing the cache/download resolver.
    #[arg(long)]
    detector_model: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut session = LivenessSession::new();
    start_loading(&mut session, &cli)?;
    log::info!("Loading models...");

    match session.wait_ready(Duration::from_secs(600)).clone() {
        SessionState::Ready => {}
        SessionState::Error(reason) => {
            return Err(format!("models failed to load: {reason}").into())
        }
        other => return Err(format!("model loading timed out (session is {other})").into()),
    }
    eprintln!();

    if cli.watch {
        run_watch(session, &cli)
    } else {
        run_scan(&mut session, &cli)
    }
}

fn run_scan(
    session: &mut LivenessSession,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = open_source(cli);
    let metadata = source.open()?;
    log::info!(
        "stream {} open at {}x{}",
        metadata.source,
        metadata.width,
        metadata.height
    );

    let mut sink = LatestLabelSink::new();
    let scan = ScanFaceUseCase::new(cli.threshold);
    let verdict = session.scan(&scan, source.as_mut(), &mut sink)?;
    source.close();

    println!("{verdict}");
    Ok(())
}

fn run_watch(mut session: LivenessSession, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let output = cli.output.as_ref().ok_or("--output is required with --watch")?;
    let mut source = open_source(cli);
    let metadata = source.open()?;
    log::info!(
        "stream {} open at {}x{}, rendering every {}ms",
        metadata.source,
        metadata.width,
        metadata.height,
        cli.period_ms
    );

    let models = session.take_models()?;
    let detector = models
        .detector
        .ok_or("watch mode requires the face detection model")?;

    let mut use_case = WatchFacesUseCase::new(
        source,
        detector,
        Box::new(RectangleOverlay::default()),
        Box::new(ImageFileSink::new(output)),
        Box::new(StdoutPipelineLogger::default()),
        Duration::from_millis(cli.period_ms),
        Arc::new(AtomicBool::new(false)),
        cli.max_cycles,
    );

    let summary = use_case.execute()?;
    log::info!(
        "watch finished: {} cycles, {} frames rendered, {} with faces, {} cycle errors",
        summary.cycles,
        summary.frames_rendered,
        summary.cycles_with_faces,
        summary.cycle_errors
    );
    log::info!("annotated frames written to {}", output.display());
    Ok(())
}

fn start_loading(
    session: &mut LivenessSession,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let need_detector = cli.watch || !cli.no_crop;
    let classifier_model = cli.classifier_model.clone();
    let detector_model = cli.detector_model.clone();
    let confidence = cli.confidence;

    session.begin_loading(move || {
        load_models(classifier_model, detector_model, need_detector, confidence)
    })?;
    Ok(())
}

/// Runs on the session's loader thread: resolve artifacts, build adapters.
fn load_models(
    classifier_model: Option<PathBuf>,
    detector_model: Option<PathBuf>,
    need_detector: bool,
    confidence: f32,
) -> LoadResult {
    let classifier_path = match classifier_model {
        Some(path) => path,
        None => model_resolver::resolve(
            LIVENESS_MODEL_NAME,
            LIVENESS_MODEL_URL,
            None,
            Some(Box::new(download_progress)),
        )
        .map_err(|e| e.to_string())?,
    };
    let classifier = OnnxLivenessClassifier::new(&classifier_path).map_err(|e| e.to_string())?;

    let detector: Option<Box<dyn FaceDetector>> = if need_detector {
        let detector_path = match detector_model {
            Some(path) => path,
            None => model_resolver::resolve(
                BLAZEFACE_MODEL_NAME,
                BLAZEFACE_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )
            .map_err(|e| e.to_string())?,
        };
        Some(Box::new(
            OnnxBlazefaceDetector::new(&detector_path, confidence).map_err(|e| e.to_string())?,
        ))
    } else {
        None
    };

    Ok(LoadedModels {
        classifier: Box::new(classifier),
        detector,
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.camera && !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !(cli.threshold > 0.0 && cli.threshold < 1.0) {
        return Err(format!(
            "Threshold must be strictly between 0.0 and 1.0, got {}",
            cli.threshold
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.period_ms == 0 {
        return Err("Period must be at least 1 ms".into());
    }
    if cli.watch && cli.output.is_none() {
        return Err("--output is required with --watch".into());
    }
    if cli.watch && cli.no_crop {
        return Err("--no-crop has no effect with --watch".into());
    }
    if cli.width == 0 || cli.height == 0 {
        return Err(format!(
            "Capture geometry must be nonzero, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_source(cli: &Cli) -> Box<dyn FrameSource> {
    if cli.camera {
        Box::new(FfmpegCameraSource::new(
            cli.input.clone(),
            CameraConfig {
                width: cli.width,
                height: cli.height,
            },
        ))
    } else if is_image(&cli.input) {
        Box::new(ImageFileSource::new(cli.input.clone()))
    } else {
        Box::new(FfmpegFileSource::new(cli.input.clone()))
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
