use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::liveness::domain::decision::{DecisionError, Verdict};
use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::pipeline::scan_face_use_case::ScanFaceUseCase;
use crate::render::domain::label_sink::LabelSink;

/// Lifecycle of a liveness session.
///
/// ```text
/// Idle ──begin_loading──► ModelLoading ──► Ready ◄──► Capturing
///                              │
///                              └──► Error (terminal until begin_loading again)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ModelLoading,
    Ready,
    Capturing,
    Error(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::ModelLoading => write!(f, "loading model"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Capturing => write!(f, "capturing"),
            SessionState::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("model not loaded (session is {state})")]
    NotReady { state: String },
    #[error("model loading already in progress")]
    LoadInProgress,
    #[error("models already loaded")]
    AlreadyLoaded,
    #[error("no frame available from the source yet")]
    FrameNotReady,
    #[error("frame source failed: {0}")]
    Device(String),
    #[error("face detection failed: {0}")]
    Detect(String),
    #[error("liveness classification failed: {0}")]
    Classify(String),
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// The models a session owns once loading succeeds.
///
/// Loaded once, shared read-only by every subsequent cycle; the detector is
/// absent when the caller classifies whole frames.
pub struct LoadedModels {
    pub classifier: Box<dyn LivenessClassifier>,
    pub detector: Option<Box<dyn FaceDetector>>,
}

/// Result a loader thread hands back: the models, or a human-readable
/// reason the artifacts could not be loaded.
pub type LoadResult = Result<LoadedModels, String>;

/// Owns the session state machine and the loaded models.
///
/// Model loading is the one long-latency operation: `begin_loading` runs the
/// supplied loader on a worker thread and the session answers `ModelLoading`
/// until the result is polled in. Scan triggers in any state but `Ready` are
/// rejected as observable no-ops — the session never pretends to be ready.
pub struct LivenessSession {
    state: SessionState,
    pending: Option<Receiver<LoadResult>>,
    models: Option<LoadedModels>,
}

impl LivenessSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            pending: None,
            models: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Starts loading models on a worker thread.
    ///
    /// Allowed from `Idle` and from `Error` (explicit retry). A session that
    /// is already loading or loaded rejects the call.
    pub fn begin_loading<F>(&mut self, loader: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> LoadResult + Send + 'static,
    {
        match self.state {
            SessionState::Idle | SessionState::Error(_) => {}
            SessionState::ModelLoading => return Err(SessionError::LoadInProgress),
            SessionState::Ready | SessionState::Capturing => {
                return Err(SessionError::AlreadyLoaded)
            }
        }

        let (tx, rx) = bounded(1);
        std::thread::Builder::new()
            .name("livegate-model-loader".into())
            .spawn(move || {
                let _ = tx.send(loader());
            })
            .map_err(|e| SessionError::Device(format!("cannot spawn loader thread: {e}")))?;

        self.pending = Some(rx);
        self.state = SessionState::ModelLoading;
        Ok(())
    }

    /// Non-blocking state advance: absorbs a finished load if one is pending.
    pub fn poll(&mut self) -> &SessionState {
        if self.state == SessionState::ModelLoading {
            if let Some(rx) = self.pending.take() {
                match rx.try_recv() {
                    Ok(result) => self.absorb_load_result(result),
                    Err(TryRecvError::Empty) => self.pending = Some(rx),
                    Err(TryRecvError::Disconnected) => {
                        self.absorb_load_result(Err("model loader thread exited".to_string()))
                    }
                }
            }
        }
        &self.state
    }

    /// Blocks until loading settles or `timeout` elapses.
    pub fn wait_ready(&mut self, timeout: Duration) -> &SessionState {
        let deadline = Instant::now() + timeout;
        while self.state == SessionState::ModelLoading {
            let Some(rx) = self.pending.take() else { break };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.pending = Some(rx);
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(result) => self.absorb_load_result(result),
                Err(RecvTimeoutError::Timeout) => {
                    self.pending = Some(rx);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.absorb_load_result(Err("model loader thread exited".to_string()))
                }
            }
        }
        &self.state
    }

    /// Runs one on-demand capture-and-classify cycle.
    ///
    /// `Ready → Capturing → Ready`; a failed cycle reports its error but
    /// returns the session to `Ready` — only model loading can poison it.
    pub fn scan(
        &mut self,
        scan: &ScanFaceUseCase,
        source: &mut dyn FrameSource,
        sink: &mut dyn LabelSink,
    ) -> Result<Verdict, SessionError> {
        self.poll();
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady {
                state: self.state.to_string(),
            });
        }

        self.state = SessionState::Capturing;
        let result = match self.models.as_mut() {
            Some(models) => scan.execute(models, source, sink),
            None => Err(SessionError::NotReady {
                state: "ready without models".to_string(),
            }),
        };
        self.state = SessionState::Ready;
        result
    }

    /// Hands the loaded models out of the session, e.g. to run the
    /// continuous watch loop which owns its own scheduling.
    ///
    /// The session returns to `Idle`, mirroring feature start.
    pub fn take_models(&mut self) -> Result<LoadedModels, SessionError> {
        self.poll();
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady {
                state: self.state.to_string(),
            });
        }
        let models = self.models.take().ok_or(SessionError::NotReady {
            state: "ready without models".to_string(),
        })?;
        self.state = SessionState::Idle;
        Ok(models)
    }

    fn absorb_load_result(&mut self, result: LoadResult) {
        self.pending = None;
        match result {
            Ok(models) => {
                self.models = Some(models);
                self.state = SessionState::Ready;
                log::info!("models loaded, session ready");
            }
            Err(reason) => {
                log::warn!("model loading failed: {reason}");
                self.state = SessionState::Error(reason);
            }
        }
    }
}

impl Default for LivenessSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::domain::label_sink::LatestLabelSink;
    use crate::shared::frame::Frame;
    use crate::shared::region::Region;
    use crate::shared::stream_metadata::StreamMetadata;
    use ndarray::Array4;

    const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

    // --- Stubs ---

    /// Classifier with a fixed 4x4 input returning a scripted probability.
    struct FixedClassifier {
        probability: f32,
    }

    impl LivenessClassifier for FixedClassifier {
        fn classify(&mut self, _input: Array4<f32>) -> Result<f32, Box<dyn std::error::Error>> {
            Ok(self.probability)
        }

        fn input_size(&self) -> (u32, u32) {
            (4, 4)
        }
    }

    /// Classifier that reports the mean of its input tensor as probability.
    struct MeanClassifier;

    impl LivenessClassifier for MeanClassifier {
        fn classify(&mut self, input: Array4<f32>) -> Result<f32, Box<dyn std::error::Error>> {
            let sum: f32 = input.iter().sum();
            Ok(sum / input.len() as f32)
        }

        fn input_size(&self) -> (u32, u32) {
            (4, 4)
        }
    }

    struct StubDetector {
        regions: Vec<Region>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(self.regions.clone())
        }
    }

    struct StubSource {
        frame: Option<Frame>,
        fail: bool,
    }

    impl StubSource {
        fn with_frame(frame: Frame) -> Self {
            Self {
                frame: Some(frame),
                fail: false,
            }
        }

        fn empty() -> Self {
            Self {
                frame: None,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                frame: None,
                fail: true,
            }
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<StreamMetadata, Box<dyn std::error::Error>> {
            Ok(StreamMetadata {
                width: 8,
                height: 8,
                fps: 30.0,
                source: "stub".to_string(),
            })
        }

        fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.fail {
                return Err("camera unplugged".into());
            }
            Ok(self.frame.clone())
        }

        fn is_active(&self) -> bool {
            self.frame.is_some()
        }

        fn close(&mut self) {
            self.frame = None;
        }
    }

    fn uniform_frame(value: u8) -> Frame {
        Frame::new(vec![value; 8 * 8 * 3], 8, 8, 0)
    }

    fn models_with(probability: f32) -> LoadedModels {
        LoadedModels {
            classifier: Box::new(FixedClassifier { probability }),
            detector: None,
        }
    }

    // --- FSM tests ---

    #[test]
    fn test_new_session_is_idle() {
        let session = LivenessSession::new();
        assert_eq!(*session.state(), SessionState::Idle);
    }

    #[test]
    fn test_successful_load_reaches_ready() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        assert_eq!(*session.state(), SessionState::ModelLoading);
        assert_eq!(*session.wait_ready(LOAD_TIMEOUT), SessionState::Ready);
    }

    #[test]
    fn test_failed_load_reaches_error() {
        let mut session = LivenessSession::new();
        session
            .begin_loading(|| Err("artifact not found (404)".to_string()))
            .unwrap();
        let state = session.wait_ready(LOAD_TIMEOUT).clone();
        assert!(matches!(state, SessionState::Error(ref r) if r.contains("404")));
    }

    #[test]
    fn test_error_state_allows_retry() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Err("boom".to_string())).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        assert_eq!(*session.wait_ready(LOAD_TIMEOUT), SessionState::Ready);
    }

    #[test]
    fn test_begin_loading_rejected_while_loading() {
        let (gate_tx, gate_rx) = bounded::<()>(1);
        let mut session = LivenessSession::new();
        session
            .begin_loading(move || {
                let _ = gate_rx.recv();
                Ok(models_with(0.9))
            })
            .unwrap();

        let second = session.begin_loading(|| Ok(models_with(0.9)));
        assert!(matches!(second, Err(SessionError::LoadInProgress)));

        gate_tx.send(()).unwrap();
        assert_eq!(*session.wait_ready(LOAD_TIMEOUT), SessionState::Ready);
    }

    #[test]
    fn test_begin_loading_rejected_when_ready() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let again = session.begin_loading(|| Ok(models_with(0.9)));
        assert!(matches!(again, Err(SessionError::AlreadyLoaded)));
    }

    // --- Scan tests ---

    #[test]
    fn test_scan_publishes_real_face_verdict() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.73))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let verdict = session.scan(&scan, &mut source, &mut sink).unwrap();
        assert_eq!(verdict, Verdict::RealFace);
        assert_eq!(sink.current(), Some(Verdict::RealFace));
        assert_eq!(*session.state(), SessionState::Ready);
    }

    #[test]
    fn test_scan_boundary_probability_is_fake() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.5))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let verdict = session.scan(&scan, &mut source, &mut sink).unwrap();
        assert_eq!(verdict, Verdict::FakeFace);
    }

    #[test]
    fn test_scan_rejected_before_loading() {
        let mut session = LivenessSession::new();
        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::NotReady { .. })));
        assert_eq!(sink.current(), None);
    }

    #[test]
    fn test_scan_rejected_after_failed_load_and_label_stays_unset() {
        let mut session = LivenessSession::new();
        session
            .begin_loading(|| Err("artifact 404".to_string()))
            .unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::NotReady { .. })));
        assert_eq!(sink.current(), None);
        assert!(matches!(session.state(), SessionState::Error(_)));
    }

    #[test]
    fn test_scan_rejected_while_loading() {
        let (gate_tx, gate_rx) = bounded::<()>(1);
        let mut session = LivenessSession::new();
        session
            .begin_loading(move || {
                let _ = gate_rx.recv();
                Ok(models_with(0.9))
            })
            .unwrap();

        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::NotReady { .. })));

        gate_tx.send(()).unwrap();
        session.wait_ready(LOAD_TIMEOUT);
        assert!(session.scan(&scan, &mut source, &mut sink).is_ok());
    }

    #[test]
    fn test_scan_without_frame_is_recoverable() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::empty();
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::FrameNotReady)));
        // The failed cycle does not poison the session.
        assert_eq!(*session.state(), SessionState::Ready);
    }

    #[test]
    fn test_scan_device_error_returns_to_ready() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::failing();
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::Device(_))));
        assert_eq!(*session.state(), SessionState::Ready);
        assert_eq!(sink.current(), None);
    }

    #[test]
    fn test_scan_rejects_out_of_range_probability() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(1.5))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let result = session.scan(&scan, &mut source, &mut sink);
        assert!(matches!(result, Err(SessionError::Decision(_))));
        assert_eq!(sink.current(), None);
    }

    #[test]
    fn test_scan_classifies_detected_crop() {
        // Frame is dark except a bright 4x4 patch; the detector points at
        // the patch, so the crop mean clears the threshold while the full
        // frame would not.
        let mut frame = uniform_frame(0);
        for y in 2..6 {
            for x in 2..6 {
                let idx = (y * 8 + x) * 3;
                frame.data_mut()[idx..idx + 3].copy_from_slice(&[230, 230, 230]);
            }
        }

        let bright_patch = Region {
            x: 2,
            y: 2,
            width: 4,
            height: 4,
            confidence: 0.95,
        };
        let mut session = LivenessSession::new();
        session
            .begin_loading(move || {
                Ok(LoadedModels {
                    classifier: Box::new(MeanClassifier),
                    detector: Some(Box::new(StubDetector {
                        regions: vec![bright_patch],
                    })),
                })
            })
            .unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(frame);
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let verdict = session.scan(&scan, &mut source, &mut sink).unwrap();
        assert_eq!(verdict, Verdict::RealFace);
    }

    #[test]
    fn test_scan_empty_detection_falls_back_to_full_frame() {
        // Mostly dark frame, detector finds nothing: the full-frame mean
        // stays below the threshold.
        let mut session = LivenessSession::new();
        session
            .begin_loading(|| {
                Ok(LoadedModels {
                    classifier: Box::new(MeanClassifier),
                    detector: Some(Box::new(StubDetector { regions: vec![] })),
                })
            })
            .unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let mut source = StubSource::with_frame(uniform_frame(25));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);

        let verdict = session.scan(&scan, &mut source, &mut sink).unwrap();
        assert_eq!(verdict, Verdict::FakeFace);
        assert_eq!(sink.current(), Some(Verdict::FakeFace));
    }

    // --- take_models ---

    #[test]
    fn test_take_models_requires_ready() {
        let mut session = LivenessSession::new();
        assert!(matches!(
            session.take_models(),
            Err(SessionError::NotReady { .. })
        ));
    }

    #[test]
    fn test_take_models_returns_session_to_idle() {
        let mut session = LivenessSession::new();
        session.begin_loading(|| Ok(models_with(0.9))).unwrap();
        session.wait_ready(LOAD_TIMEOUT);

        let models = session.take_models().unwrap();
        assert!(models.detector.is_none());
        assert_eq!(*session.state(), SessionState::Idle);

        // A scan after the models moved out is rejected again.
        let mut source = StubSource::with_frame(uniform_frame(128));
        let mut sink = LatestLabelSink::new();
        let scan = ScanFaceUseCase::new(0.5);
        assert!(matches!(
            session.scan(&scan, &mut source, &mut sink),
            Err(SessionError::NotReady { .. })
        ));
    }
}
