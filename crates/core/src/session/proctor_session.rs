use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::capture::domain::camera_error::CameraError;
use crate::capture::domain::capture_device::{CaptureConstraints, CaptureDevice};
use crate::capture::domain::capture_manager::CaptureManager;
use crate::detection::domain::detector_adapter::DetectorAdapter;
use crate::detection::domain::face_detector::{DetectorLoader, ModelLoadError};
use crate::detection::infrastructure::deadline_face_detector::DeadlineFaceDetector;
use crate::presence::domain::presence_machine::PresenceMachine;
use crate::presentation::domain::status_text::{self, Locale};
use crate::presentation::domain::status_view::StatusView;
use crate::reporting::domain::violation_reporter::ViolationReporter;
use crate::session::detection_loop::DetectionLoop;
use crate::session::presence_tick::{PresenceTick, SharedView};
use crate::session::violation_dispatcher::{ResponseHandler, ViolationCallback, ViolationDispatcher};
use crate::shared::config::{ConfigError, ConfigOverrides, PresenceConfig};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Model(#[from] ModelLoadError),
    #[error("session is already initialized")]
    AlreadyInitialized,
}

impl InitError {
    /// Localized text for the proctoring widget.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            InitError::Config(e) => status_text::config_error_message(locale, &e.to_string()),
            InitError::Camera(e) => status_text::camera_error_message(locale, e),
            InitError::Model(e) => status_text::model_error_message(locale, &e.to_string()),
            InitError::AlreadyInitialized => self.to_string(),
        }
    }
}

/// The pluggable parts of a session.
pub struct SessionComponents {
    pub camera: Box<dyn CaptureDevice>,
    pub detector_loader: Box<dyn DetectorLoader>,
    /// `None` keeps violations local (callback only).
    pub reporter: Option<Arc<dyn ViolationReporter>>,
    pub view: Box<dyn StatusView>,
}

/// Per-initialization options.
pub struct SessionOptions {
    pub attempt_id: String,
    pub on_violation: Option<ViolationCallback>,
    pub on_response: Option<ResponseHandler>,
    pub overrides: ConfigOverrides,
}

impl SessionOptions {
    pub fn new(attempt_id: impl Into<String>) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            on_violation: None,
            on_response: None,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn on_violation(mut self, callback: ViolationCallback) -> Self {
        self.on_violation = Some(callback);
        self
    }

    pub fn on_response(mut self, handler: ResponseHandler) -> Self {
        self.on_response = Some(handler);
        self
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Webcam face-presence monitoring for one exam attempt.
///
/// Lifecycle: [`initialize`] acquires the detector and camera,
/// [`start_detection`]/[`stop_detection`] toggle the periodic check, and
/// [`destroy`] releases everything. Dropping the session destroys it.
///
/// [`initialize`]: ProctorSession::initialize
/// [`start_detection`]: ProctorSession::start_detection
/// [`stop_detection`]: ProctorSession::stop_detection
/// [`destroy`]: ProctorSession::destroy
pub struct ProctorSession {
    base_config: PresenceConfig,
    capture: CaptureManager,
    detector_loader: Box<dyn DetectorLoader>,
    reporter: Option<Arc<dyn ViolationReporter>>,
    view: SharedView,
    config: Option<PresenceConfig>,
    detection: DetectionLoop<PresenceTick>,
    /// The tick worker while detection is stopped.
    idle_tick: Option<PresenceTick>,
}

impl ProctorSession {
    pub fn new(components: SessionComponents) -> Self {
        Self::with_config(components, PresenceConfig::default())
    }

    /// `base_config` is what [`SessionOptions::overrides`] apply on top of.
    pub fn with_config(components: SessionComponents, base_config: PresenceConfig) -> Self {
        Self {
            base_config,
            capture: CaptureManager::new(components.camera),
            detector_loader: components.detector_loader,
            reporter: components.reporter,
            view: Arc::new(Mutex::new(components.view)),
            config: None,
            detection: DetectionLoop::new(),
            idle_tick: None,
        }
    }

    /// Prepares the session. On failure the localized error is shown in the
    /// view, no camera is held, and `false` is returned.
    pub fn initialize(&mut self, options: SessionOptions) -> bool {
        let locale = options.overrides.locale.unwrap_or(self.base_config.locale);
        match self.try_initialize(options) {
            Ok(()) => true,
            Err(InitError::AlreadyInitialized) => {
                log::warn!("initialize called on an initialized session; ignored");
                false
            }
            Err(e) => {
                log::error!("Proctoring initialization failed: {e}");
                self.with_view(|view| view.show_error(&e.user_message(locale)));
                false
            }
        }
    }

    pub fn try_initialize(&mut self, options: SessionOptions) -> Result<(), InitError> {
        if self.is_initialized() {
            return Err(InitError::AlreadyInitialized);
        }

        let config = self.base_config.clone().with_overrides(&options.overrides);
        config.validate()?;

        self.with_view(|view| view.show_notice(status_text::initializing_message(config.locale)));

        let detector = self.detector_loader.load(&config.model_source)?;
        let stream = self.capture.acquire(&CaptureConstraints::default())?;

        let warm_up = stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_frame();
        if let Err(e) = warm_up {
            self.capture.release();
            return Err(e.into());
        }
        self.with_view(|view| view.clear());

        let detector = DetectorAdapter::new(
            Box::new(DeadlineFaceDetector::new(detector, config.detection_timeout())),
            config.min_confidence,
        );
        let dispatcher = ViolationDispatcher::new(
            options.on_violation,
            self.reporter.clone(),
            options.on_response,
        );
        self.idle_tick = Some(PresenceTick::new(
            stream,
            detector,
            PresenceMachine::new(options.attempt_id.clone(), &config),
            config.inconclusive_policy,
            self.view.clone(),
            dispatcher,
        ));
        log::info!(
            "Proctoring initialized for attempt {} (missing {}s, warning {}s, every {}ms)",
            options.attempt_id,
            config.missing_threshold_seconds,
            config.warning_threshold_seconds,
            config.detection_interval_ms
        );
        self.config = Some(config);
        Ok(())
    }

    /// Starts periodic detection. No-op unless initialized and stopped.
    pub fn start_detection(&mut self) {
        let Some(interval) = self.config.as_ref().map(PresenceConfig::detection_interval) else {
            log::debug!("start_detection before initialize; ignored");
            return;
        };
        let Some(tick) = self.idle_tick.take() else {
            return;
        };
        if let Err(tick) = self.detection.start(interval, tick) {
            self.idle_tick = Some(tick);
            return;
        }
        log::info!("Face detection started");
    }

    /// Stops periodic detection and keeps the camera open.
    pub fn stop_detection(&mut self) {
        if let Some(tick) = self.detection.stop() {
            self.idle_tick = Some(tick);
            log::info!("Face detection stopped");
        }
    }

    /// Stops detection, releases the camera and clears the view, in that
    /// order. Safe to call any number of times.
    pub fn destroy(&mut self) {
        self.stop_detection();
        self.idle_tick = None;
        self.capture.release();
        self.with_view(|view| view.clear());
        if self.config.take().is_some() {
            log::info!("Proctoring session destroyed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn is_detecting(&self) -> bool {
        self.detection.is_running()
    }

    /// Effective configuration, once initialized.
    pub fn config(&self) -> Option<&PresenceConfig> {
        self.config.as_ref()
    }

    fn with_view(&self, f: impl FnOnce(&mut dyn StatusView)) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **view);
    }
}

impl Drop for ProctorSession {
    fn drop(&mut self) {
        self.destroy();
    }
}
