use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::camera_error::CameraError;
use crate::capture::domain::capture_manager::SharedStream;
use crate::detection::domain::detector_adapter::DetectorAdapter;
use crate::detection::domain::face_detector::DetectorError;
use crate::presence::domain::presence_effect::PresenceEffect;
use crate::presence::domain::presence_machine::PresenceMachine;
use crate::presence::domain::presence_state::{DetectionSample, PresenceState, PresenceStatus};
use crate::presentation::domain::status_view::StatusView;
use crate::session::detection_loop::TickWorker;
use crate::session::violation_dispatcher::ViolationDispatcher;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::InconclusivePolicy;

/// The status view, shared between the session and the tick.
pub type SharedView = Arc<Mutex<Box<dyn StatusView>>>;

/// A tick that could not tell whether a face was there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InconclusiveTick {
    #[error("frame unavailable: {0}")]
    Camera(#[from] CameraError),
    #[error("detection failed: {0}")]
    Detector(#[from] DetectorError),
}

/// What one tick saw.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub boxes: Vec<BoundingBox>,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// One detection pass: read the current frame, detect, advance presence
/// state and apply the resulting effects.
///
/// Owns the only mutable copy of [`PresenceState`].
pub struct PresenceTick {
    stream: SharedStream,
    detector: DetectorAdapter,
    machine: PresenceMachine,
    state: PresenceState,
    policy: InconclusivePolicy,
    view: SharedView,
    violations: ViolationDispatcher,
}

impl PresenceTick {
    pub fn new(
        stream: SharedStream,
        detector: DetectorAdapter,
        machine: PresenceMachine,
        policy: InconclusivePolicy,
        view: SharedView,
        violations: ViolationDispatcher,
    ) -> Self {
        Self {
            stream,
            detector,
            machine,
            state: PresenceState::new(),
            policy,
            view,
            violations,
        }
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    fn observe(&mut self) -> Result<Observation, InconclusiveTick> {
        let frame = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_frame()?;
        let boxes = self.detector.detect(&frame)?;
        Ok(Observation {
            boxes,
            frame_width: frame.width(),
            frame_height: frame.height(),
        })
    }

    /// Runs a tick with `now` as the sample time.
    pub fn tick_at(&mut self, now: Instant) {
        let observation = self.observe();
        self.apply(observation, now);
    }

    fn apply(&mut self, observation: Result<Observation, InconclusiveTick>, now: Instant) {
        let (sample, frame_size) = match observation {
            Ok(seen) => (
                DetectionSample::from_boxes(seen.boxes, now),
                (seen.frame_width, seen.frame_height),
            ),
            Err(reason) => match self.policy {
                InconclusivePolicy::Ignore => {
                    log::warn!("Inconclusive tick ignored: {reason}");
                    return;
                }
                InconclusivePolicy::TreatAsAbsent => {
                    log::warn!("Inconclusive tick counted as absent: {reason}");
                    (DetectionSample::absent(now), (0, 0))
                }
            },
        };

        let transition = self.machine.advance(&self.state, &sample);
        log::debug!(
            "Tick: {} face(s), {:?} -> {:?}",
            sample.boxes.len(),
            self.state.status,
            transition.state.status
        );
        self.state = transition.state;

        for effect in transition.effects {
            match effect {
                PresenceEffect::UpdateStatusDisplay {
                    status,
                    seconds_remaining,
                } => {
                    let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
                    // Faces first so the status line can describe this tick's faces.
                    if status == PresenceStatus::Present {
                        view.show_faces(&sample.boxes, frame_size.0, frame_size.1);
                    }
                    view.show_status(status, seconds_remaining);
                }
                PresenceEffect::EmitViolation(event) => {
                    log::warn!(
                        "Face not detected for attempt {}; raising violation",
                        event.attempt_id
                    );
                    self.violations.dispatch(&event);
                }
            }
        }
    }
}

impl TickWorker for PresenceTick {
    fn tick(&mut self) {
        let observation = self.observe();
        // Timestamped after detection so slow inference is not counted
        // against the candidate.
        self.apply(observation, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_device::CameraStream;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::presence::domain::presence_effect::ViolationKind;
    use crate::shared::config::PresenceConfig;
    use crate::shared::frame::Frame;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Camera that always has a frame unless told to fail.
    struct FakeStream {
        fail: bool,
    }

    impl CameraStream for FakeStream {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            if self.fail {
                return Err(CameraError::Other("unplugged".to_string()));
            }
            Ok(Frame::new(vec![0u8; 320 * 240 * 3], 320, 240, 3, 0))
        }
        fn stop(&mut self) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    /// Detector that replays a script of outcomes; `Ok(true)` is a face.
    struct ScriptedDetector {
        script: Arc<Mutex<VecDeque<Result<bool, DetectorError>>>>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
            let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(false));
            next.map(|face| {
                if face {
                    vec![BoundingBox {
                        x: 100.0,
                        y: 60.0,
                        width: 80.0,
                        height: 100.0,
                        confidence: 0.9,
                    }]
                } else {
                    Vec::new()
                }
            })
        }
    }

    #[derive(Default)]
    struct Recorded {
        statuses: Vec<(PresenceStatus, Option<f64>)>,
        faces: usize,
        /// Faces shown so far, sampled at each status update.
        faces_at_status: Vec<usize>,
    }

    struct RecordingView(Arc<Mutex<Recorded>>);

    impl StatusView for RecordingView {
        fn show_status(&mut self, status: PresenceStatus, seconds_remaining: Option<f64>) {
            let mut recorded = self.0.lock().unwrap();
            recorded.statuses.push((status, seconds_remaining));
            let faces = recorded.faces;
            recorded.faces_at_status.push(faces);
        }
        fn show_faces(&mut self, boxes: &[BoundingBox], _w: u32, _h: u32) {
            self.0.lock().unwrap().faces += boxes.len();
        }
        fn show_error(&mut self, _message: &str) {}
        fn clear(&mut self) {}
    }

    struct Harness {
        tick: PresenceTick,
        script: Arc<Mutex<VecDeque<Result<bool, DetectorError>>>>,
        recorded: Arc<Mutex<Recorded>>,
        violations: Arc<Mutex<Vec<ViolationKind>>>,
    }

    fn harness(policy: InconclusivePolicy, camera_fails: bool) -> Harness {
        let script = Arc::new(Mutex::new(VecDeque::new()));
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let violations = Arc::new(Mutex::new(Vec::new()));

        let camera: Box<dyn CameraStream> = Box::new(FakeStream { fail: camera_fails });
        let stream: SharedStream = Arc::new(Mutex::new(camera));
        let detector = DetectorAdapter::new(
            Box::new(ScriptedDetector {
                script: script.clone(),
            }),
            0.5,
        );
        let machine = PresenceMachine::new("attempt-1", &PresenceConfig::default());
        let view: Box<dyn StatusView> = Box::new(RecordingView(recorded.clone()));
        let view: SharedView = Arc::new(Mutex::new(view));
        let sink = violations.clone();
        let dispatcher = ViolationDispatcher::new(
            Some(Arc::new(move |kind: ViolationKind| sink.lock().unwrap().push(kind))),
            None,
            None,
        );

        Harness {
            tick: PresenceTick::new(stream, detector, machine, policy, view, dispatcher),
            script,
            recorded,
            violations,
        }
    }

    impl Harness {
        fn push(&self, outcome: Result<bool, DetectorError>) {
            self.script.lock().unwrap().push_back(outcome);
        }
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    #[test]
    fn test_present_tick_shows_status_and_faces() {
        let mut h = harness(InconclusivePolicy::Ignore, false);
        h.push(Ok(true));
        h.tick.tick_at(Instant::now());

        let recorded = h.recorded.lock().unwrap();
        assert_eq!(recorded.statuses, vec![(PresenceStatus::Present, None)]);
        assert_eq!(recorded.faces, 1);
        assert_eq!(recorded.faces_at_status, vec![1]);
    }

    #[test]
    fn test_absence_escalates_to_violation_every_window() {
        let mut h = harness(InconclusivePolicy::Ignore, false);
        let t0 = Instant::now();
        for s in (0..=20).step_by(2) {
            h.push(Ok(false));
            h.tick.tick_at(at(t0, s));
        }

        // violations at t=10 (re-armed) and t=20
        assert_eq!(h.violations.lock().unwrap().len(), 2);
        assert_eq!(h.tick.state().status, PresenceStatus::Violated);
        assert_eq!(h.tick.state().missing_since, Some(at(t0, 20)));
    }

    #[test]
    fn test_ignored_inconclusive_tick_leaves_state_untouched() {
        let mut h = harness(InconclusivePolicy::Ignore, false);
        let t0 = Instant::now();
        h.push(Ok(false));
        h.tick.tick_at(t0);
        let before = h.tick.state().clone();

        h.push(Err(DetectorError::Timeout(Duration::from_secs(2))));
        h.tick.tick_at(at(t0, 12));

        assert_eq!(h.tick.state(), &before);
        assert!(h.violations.lock().unwrap().is_empty());
        assert_eq!(h.recorded.lock().unwrap().statuses.len(), 1);
    }

    #[test]
    fn test_fail_closed_counts_inconclusive_as_absent() {
        let mut h = harness(InconclusivePolicy::TreatAsAbsent, false);
        let t0 = Instant::now();
        h.push(Err(DetectorError::Busy));
        h.tick.tick_at(t0);
        h.push(Err(DetectorError::Inference("bad".to_string())));
        h.tick.tick_at(at(t0, 10));

        assert_eq!(h.violations.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_camera_failure_follows_policy() {
        let t0 = Instant::now();

        let mut open = harness(InconclusivePolicy::Ignore, true);
        open.tick.tick_at(t0);
        open.tick.tick_at(at(t0, 30));
        assert!(open.violations.lock().unwrap().is_empty());
        assert!(open.recorded.lock().unwrap().statuses.is_empty());

        let mut closed = harness(InconclusivePolicy::TreatAsAbsent, true);
        closed.tick.tick_at(t0);
        closed.tick.tick_at(at(t0, 10));
        assert_eq!(closed.violations.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_single_presence_resets_countdown() {
        let mut h = harness(InconclusivePolicy::Ignore, false);
        let t0 = Instant::now();
        for (s, face) in [(0, false), (6, false), (8, true), (10, false), (18, false)] {
            h.push(Ok(face));
            h.tick.tick_at(at(t0, s));
        }

        assert!(h.violations.lock().unwrap().is_empty());
        assert_eq!(h.tick.state().status, PresenceStatus::Warning);
        assert_eq!(h.tick.state().missing_since, Some(at(t0, 10)));
    }
}
