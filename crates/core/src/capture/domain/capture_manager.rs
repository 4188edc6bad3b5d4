use std::sync::{Arc, Mutex, PoisonError};

use crate::capture::domain::camera_error::CameraError;
use crate::capture::domain::capture_device::{CameraStream, CaptureConstraints, CaptureDevice};

/// A camera stream shared between the session and the detection tick.
pub type SharedStream = Arc<Mutex<Box<dyn CameraStream>>>;

/// Owns the camera resource lifecycle for one session.
///
/// At most one stream is held at a time; every successful `acquire` is
/// paired with exactly one stop of the device, however many times
/// `release` is called.
pub struct CaptureManager {
    device: Box<dyn CaptureDevice>,
    stream: Option<SharedStream>,
}

impl CaptureManager {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            stream: None,
        }
    }

    /// Opens the camera. A stream still held from a previous acquire is
    /// released first.
    pub fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<SharedStream, CameraError> {
        self.release();
        let stream = self.device.acquire(constraints)?;
        log::info!("Camera acquired");
        let shared: SharedStream = Arc::new(Mutex::new(stream));
        self.stream = Some(shared.clone());
        Ok(shared)
    }

    pub fn stream(&self) -> Option<&SharedStream> {
        self.stream.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.stream.is_some()
    }

    /// Stops the held stream, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            let mut guard = stream.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.is_active() {
                guard.stop();
            }
            log::info!("Camera released");
        }
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        stopped: AtomicUsize,
    }

    struct FakeStream {
        active: bool,
        counters: Arc<Counters>,
    }

    impl CameraStream for FakeStream {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            Ok(Frame::new(vec![0u8; 12], 2, 2, 3, 0))
        }

        fn stop(&mut self) {
            if self.active {
                self.active = false;
                self.counters.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct FakeDevice {
        counters: Arc<Counters>,
        fail_with: Option<CameraError>,
    }

    impl CaptureDevice for FakeDevice {
        fn acquire(
            &mut self,
            _constraints: &CaptureConstraints,
        ) -> Result<Box<dyn CameraStream>, CameraError> {
            if let Some(ref e) = self.fail_with {
                return Err(e.clone());
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                active: true,
                counters: self.counters.clone(),
            }))
        }
    }

    fn manager(fail_with: Option<CameraError>) -> (CaptureManager, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let device = FakeDevice {
            counters: counters.clone(),
            fail_with,
        };
        (CaptureManager::new(Box::new(device)), counters)
    }

    #[test]
    fn test_acquire_then_release_stops_once() {
        let (mut mgr, counters) = manager(None);
        mgr.acquire(&CaptureConstraints::default()).unwrap();
        assert!(mgr.is_holding());

        mgr.release();
        mgr.release();

        assert!(!mgr.is_holding());
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_before_acquire_is_noop() {
        let (mut mgr, counters) = manager(None);
        mgr.release();
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reacquire_releases_previous_stream() {
        let (mut mgr, counters) = manager(None);
        mgr.acquire(&CaptureConstraints::default()).unwrap();
        mgr.acquire(&CaptureConstraints::default()).unwrap();
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_acquire_holds_nothing() {
        let (mut mgr, counters) = manager(Some(CameraError::PermissionDenied));
        let err = mgr.acquire(&CaptureConstraints::default()).err();
        assert_eq!(err, Some(CameraError::PermissionDenied));
        assert!(!mgr.is_holding());
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_release_handles_externally_stopped_stream() {
        let (mut mgr, counters) = manager(None);
        let shared = mgr.acquire(&CaptureConstraints::default()).unwrap();
        shared.lock().unwrap().stop();
        mgr.release();
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_stream() {
        let (mut mgr, counters) = manager(None);
        mgr.acquire(&CaptureConstraints::default()).unwrap();
        drop(mgr);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_constraints() {
        let c = CaptureConstraints::default();
        assert_eq!((c.ideal_width, c.ideal_height), (320, 240));
        assert_eq!(c.facing_mode, crate::capture::domain::capture_device::FacingMode::User);
    }
}
