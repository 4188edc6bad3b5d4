use crate::detection::domain::face_detector::{DetectorError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Applies the session's confidence floor to a raw detector.
///
/// This is the only place the threshold is enforced; downstream code takes
/// "any box" to mean "a face is present".
pub struct DetectorAdapter {
    inner: Box<dyn FaceDetector>,
    min_confidence: f64,
}

impl DetectorAdapter {
    pub fn new(inner: Box<dyn FaceDetector>, min_confidence: f64) -> Self {
        Self {
            inner,
            min_confidence,
        }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
        let raw = self.inner.detect(frame)?;
        Ok(BoundingBox::filter_by_confidence(&raw, self.min_confidence))
    }
}
