use std::io;

use thiserror::Error;

/// Why a camera could not be opened or read.
///
/// The three variants map to distinct user-facing messages, so adapters
/// must classify device errors rather than collapsing them into `Other`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera access was denied")]
    PermissionDenied,
    #[error("no camera device was found")]
    DeviceNotFound,
    #[error("camera failure: {0}")]
    Other(String),
}

impl From<io::Error> for CameraError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            io::ErrorKind::NotFound => CameraError::DeviceNotFound,
            _ => CameraError::Other(e.to_string()),
        }
    }
}
