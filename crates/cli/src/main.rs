mod settings;
mod terminal_view;

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use proctorwatch_core::capture::domain::capture_device::CaptureDevice;
use proctorwatch_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use proctorwatch_core::capture::infrastructure::still_image_camera::StillImageCamera;
use proctorwatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloLoader;
use proctorwatch_core::presence::domain::presence_effect::ViolationKind;
use proctorwatch_core::presentation::domain::status_text::Locale;
use proctorwatch_core::reporting::domain::violation_reporter::{
    ServerAck, ViolationAction, ViolationReporter,
};
use proctorwatch_core::reporting::infrastructure::http_violation_reporter::HttpViolationReporter;
use proctorwatch_core::session::proctor_session::{
    ProctorSession, SessionComponents, SessionOptions,
};
use proctorwatch_core::shared::config::{ConfigOverrides, InconclusivePolicy};

use settings::Settings;
use terminal_view::TerminalStatusView;

#[derive(Parser)]
#[command(name = "proctorwatch", about = "Webcam face-presence monitoring for an exam attempt")]
struct Cli {
    /// Exam attempt being proctored
    #[arg(long)]
    attempt_id: String,

    /// Exam backend base URL; violations are only printed when omitted
    #[arg(long)]
    endpoint: Option<String>,

    /// Capture device (default: platform camera)
    #[arg(long, conflicts_with = "image")]
    device: Option<String>,

    /// ffmpeg input format for the device (v4l2, avfoundation, dshow)
    #[arg(long)]
    input_format: Option<String>,

    /// Use a still image instead of a camera
    #[arg(long)]
    image: Option<PathBuf>,

    /// Settings file (default: per-user settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds without a face before a violation
    #[arg(long)]
    missing_threshold: Option<f64>,

    /// Seconds without a face before the warning countdown
    #[arg(long)]
    warning_threshold: Option<f64>,

    /// Detection interval in milliseconds
    #[arg(long)]
    interval: Option<u64>,

    /// Upper bound on one detection call in milliseconds (default: interval)
    #[arg(long)]
    timeout: Option<u64>,

    /// Minimum face confidence (0.0-1.0)
    #[arg(long)]
    confidence: Option<f64>,

    /// Status text language (en, id)
    #[arg(long)]
    locale: Option<Locale>,

    /// Directory searched for a bundled copy of the detection model
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Count failed detections as "no face" instead of skipping them
    #[arg(long)]
    fail_closed: bool,
}

impl Cli {
    fn overrides(&self, settings: &Settings) -> ConfigOverrides {
        let model_source = self.model_dir.as_ref().map(|dir| {
            let mut source = settings.presence.model_source.clone();
            source.bundled_dir = Some(dir.clone());
            source
        });
        ConfigOverrides {
            missing_threshold_seconds: self.missing_threshold,
            warning_threshold_seconds: self.warning_threshold,
            detection_interval_ms: self.interval,
            detection_timeout_ms: self.timeout,
            min_confidence: self.confidence,
            inconclusive_policy: self.fail_closed.then_some(InconclusivePolicy::TreatAsAbsent),
            locale: self.locale,
            model_source,
        }
    }

    fn camera(&self, settings: &Settings) -> Box<dyn CaptureDevice> {
        if let Some(ref path) = self.image {
            return Box::new(StillImageCamera::new(path));
        }
        let camera = match self.device.as_ref().or(settings.device.as_ref()) {
            Some(device) => FfmpegCamera::new(device.as_str()),
            None => FfmpegCamera::default(),
        };
        match self.input_format {
            Some(ref format) => Box::new(camera.with_input_format(format.as_str())),
            None => Box::new(camera),
        }
    }
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
    let settings = Settings::load(cli.config.as_deref())?;
    let overrides = cli.overrides(&settings);
    let locale = overrides.locale.unwrap_or(settings.presence.locale);

    let reporter: Option<Arc<dyn ViolationReporter>> =
        match cli.endpoint.as_ref().or(settings.endpoint.as_ref()) {
            Some(url) => Some(Arc::new(HttpViolationReporter::new(url.as_str())?)),
            None => {
                log::warn!("No --endpoint given; violations will not be reported");
                None
            }
        };

    let components = SessionComponents {
        camera: cli.camera(&settings),
        detector_loader: Box::new(OnnxYoloLoader),
        reporter,
        view: Box::new(TerminalStatusView::new(locale)),
    };
    let mut session = ProctorSession::with_config(components, settings.presence.clone());

    let options = SessionOptions::new(cli.attempt_id.as_str())
        .overrides(overrides)
        .on_violation(Arc::new(|kind: ViolationKind| {
            log::warn!("Violation raised: {kind}");
        }))
        .on_response(Arc::new(print_instruction));

    session
        .try_initialize(options)
        .map_err(|e| e.user_message(locale))?;
    session.start_detection();

    eprintln!();
    eprintln!(
        "Monitoring attempt {}. Press Enter to stop.",
        cli.attempt_id
    );
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    session.destroy();
    eprintln!("Monitoring stopped.");
    Ok(())
}

fn print_instruction(ack: &ServerAck) {
    let Some(instruction) = ack.instruction() else {
        eprintln!("\nViolation recorded: {}", ack.raw());
        return;
    };
    let headline = match instruction.action {
        ViolationAction::Warning => "Warning".to_string(),
        ViolationAction::Penalty => format!("Penalty (total {:.0}%)", instruction.total_penalty),
        ViolationAction::AutoSubmit => "Attempt submitted".to_string(),
        ViolationAction::Other(ref action) => action.clone(),
    };
    eprintln!(
        "\n[violation #{}] {headline}: {}",
        instruction.count, instruction.message
    );
}
