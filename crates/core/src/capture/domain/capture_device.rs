use crate::capture::domain::camera_error::CameraError;
use crate::shared::constants::{DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH};
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// What to ask the camera for. Sizes are hints; devices may deliver
/// another resolution. Audio is never requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing_mode: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: DEFAULT_CAPTURE_WIDTH,
            ideal_height: DEFAULT_CAPTURE_HEIGHT,
            facing_mode: FacingMode::User,
        }
    }
}

/// An open camera feed. Holding one keeps the hardware camera on.
pub trait CameraStream: Send {
    /// Reads the most recent frame.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    /// Stops the feed and turns the camera off. Must be idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Opens camera feeds.
pub trait CaptureDevice: Send {
    fn acquire(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}
