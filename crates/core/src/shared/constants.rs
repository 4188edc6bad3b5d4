pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Absence before a violation is raised (seconds).
pub const DEFAULT_MISSING_THRESHOLD_SECS: f64 = 10.0;

/// Absence before the warning countdown starts (seconds).
pub const DEFAULT_WARNING_THRESHOLD_SECS: f64 = 5.0;

pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 2000;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Ideal capture resolution requested from the camera.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 320;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 240;

/// Size of the on-screen preview widget the overlay is mapped into.
pub const PREVIEW_WIDTH: u32 = 200;
pub const PREVIEW_HEIGHT: u32 = 150;

/// Path prefix of the violation endpoint; the attempt id is appended.
pub const VIOLATION_ENDPOINT_PATH: &str = "/certification/quiz/violation";

/// Upper bound (exclusive) of JSON-RPC request ids.
pub const RPC_ID_RANGE: u32 = 1_000_000;
