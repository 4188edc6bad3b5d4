use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::detection::domain::face_detector::{DetectorError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

type DetectionResult = Result<Vec<BoundingBox>, DetectorError>;

/// Decorator that bounds how long a caller waits for detection.
///
/// The inner detector runs on its own worker thread. A call that misses
/// its deadline keeps running there; until it finishes, further calls
/// return [`DetectorError::Busy`] instead of queueing a second inference.
/// Its late result is discarded.
pub struct DeadlineFaceDetector {
    request_tx: Option<Sender<Frame>>,
    result_rx: Receiver<DetectionResult>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
    in_flight: bool,
}

impl DeadlineFaceDetector {
    pub fn new(inner: Box<dyn FaceDetector>, timeout: Duration) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::bounded::<Frame>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<DetectionResult>(1);
        let worker = spawn_worker(inner, request_rx, result_tx);
        Self {
            request_tx: Some(request_tx),
            result_rx,
            worker: Some(worker),
            timeout,
            in_flight: false,
        }
    }

    /// Collects a result left over from a timed-out call, if it has arrived.
    fn settle_previous(&mut self) -> Result<(), DetectorError> {
        if !self.in_flight {
            return Ok(());
        }
        match self.result_rx.try_recv() {
            Ok(_) => {
                log::debug!("Discarded late detection result");
                self.in_flight = false;
                Ok(())
            }
            Err(TryRecvError::Empty) => Err(DetectorError::Busy),
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                Err(DetectorError::Disconnected)
            }
        }
    }
}

fn spawn_worker(
    mut inner: Box<dyn FaceDetector>,
    request_rx: Receiver<Frame>,
    result_tx: Sender<DetectionResult>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for frame in request_rx.iter() {
            let result = inner.detect(&frame);
            if result_tx.send(result).is_err() {
                break;
            }
        }
    })
}

impl FaceDetector for DeadlineFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
        self.settle_previous()?;

        let request_tx = self.request_tx.as_ref().ok_or(DetectorError::Disconnected)?;
        request_tx
            .send(frame.clone())
            .map_err(|_| DetectorError::Disconnected)?;
        self.in_flight = true;

        match self.result_rx.recv_timeout(self.timeout) {
            Ok(result) => {
                self.in_flight = false;
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(DetectorError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                Err(DetectorError::Disconnected)
            }
        }
    }
}

impl Drop for DeadlineFaceDetector {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.request_tx.take();
        if let Some(handle) = self.worker.take() {
            if self.in_flight {
                // A hung inference must not hold up teardown; the worker
                // exits on its own once the call returns.
                log::debug!("Detaching detector worker with a call in flight");
            } else if handle.join().is_err() {
                log::warn!("Detector worker panicked");
            }
        }
    }
}
