use std::time::Duration;

use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::ModelSource;
use crate::shared::frame::Frame;

/// Why a single detection call produced no answer.
///
/// None of these are fatal: the tick that hit one is inconclusive and the
/// next tick tries again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("detection did not finish within {0:?}")]
    Timeout(Duration),
    #[error("previous detection is still running")]
    Busy,
    #[error("detector worker is gone")]
    Disconnected,
}

/// The detection model could not be made ready.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("could not obtain model {name}: {reason}")]
    Resolve { name: String, reason: String },
    #[error("could not load model {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Domain interface for face detection.
///
/// Implementations may be stateful, hence `&mut self`. Returned boxes are
/// in frame pixel coordinates.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Builds a ready detector at session initialization.
pub trait DetectorLoader: Send {
    fn load(&self, source: &ModelSource) -> Result<Box<dyn FaceDetector>, ModelLoadError>;
}
