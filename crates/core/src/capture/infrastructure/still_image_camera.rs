use std::path::{Path, PathBuf};

use crate::capture::domain::camera_error::CameraError;
use crate::capture::domain::capture_device::{CameraStream, CaptureConstraints, CaptureDevice};
use crate::shared::frame::Frame;

/// Stands in for a camera by replaying one image file.
///
/// Useful for dry runs on machines without a webcam: every read returns the
/// same picture with an increasing sequence number.
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureDevice for StillImageCamera {
    fn acquire(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        let frame = load_frame(&self.path)?;
        log::info!(
            "Replaying {} ({}x{}) as camera input",
            self.path.display(),
            frame.width(),
            frame.height()
        );
        Ok(Box::new(StillImageStream {
            frame: Some(frame),
            sequence: 0,
        }))
    }
}

fn load_frame(path: &Path) -> Result<Frame, CameraError> {
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => CameraError::from(io),
        other => CameraError::Other(other.to_string()),
    })?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}

struct StillImageStream {
    frame: Option<Frame>,
    sequence: u64,
}

impl CameraStream for StillImageStream {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| CameraError::Other("camera stream is stopped".to_string()))?;
        let next = frame.clone().with_sequence(self.sequence);
        self.sequence += 1;
        Ok(next)
    }

    fn stop(&mut self) {
        self.frame = None;
    }

    fn is_active(&self) -> bool {
        self.frame.is_some()
    }
}
