use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::presence::domain::presence_effect::{ViolationEvent, ViolationKind};
use crate::reporting::domain::violation_reporter::{ServerAck, ViolationReporter};

/// Called synchronously for every violation, before it is reported.
pub type ViolationCallback = Arc<dyn Fn(ViolationKind) + Send + Sync>;

/// Receives the backend's acknowledgement of a reported violation.
pub type ResponseHandler = Arc<dyn Fn(&ServerAck) + Send + Sync>;

/// Delivers violations to the embedder's callback and the backend.
///
/// Reporting is fire-and-forget: each report runs on its own short-lived
/// thread, failures are logged and never retried, and nothing flows back
/// into presence tracking.
#[derive(Clone, Default)]
pub struct ViolationDispatcher {
    on_violation: Option<ViolationCallback>,
    reporter: Option<Arc<dyn ViolationReporter>>,
    on_response: Option<ResponseHandler>,
}

impl ViolationDispatcher {
    pub fn new(
        on_violation: Option<ViolationCallback>,
        reporter: Option<Arc<dyn ViolationReporter>>,
        on_response: Option<ResponseHandler>,
    ) -> Self {
        Self {
            on_violation,
            reporter,
            on_response,
        }
    }

    /// Returns the handle of the reporting thread, if a report was sent.
    /// Violations without an attempt id only reach the callback.
    pub fn dispatch(&self, event: &ViolationEvent) -> Option<JoinHandle<()>> {
        if let Some(ref callback) = self.on_violation {
            let kind = event.kind;
            if panic::catch_unwind(AssertUnwindSafe(|| callback(kind))).is_err() {
                log::error!("Violation callback panicked for attempt {}", event.attempt_id);
            }
        }

        let reporter = self.reporter.clone()?;
        if event.attempt_id.is_empty() {
            log::debug!("No attempt id; violation not reported to the backend");
            return None;
        }
        let on_response = self.on_response.clone();
        let attempt_id = event.attempt_id.clone();
        let kind = event.kind;
        Some(thread::spawn(move || {
            match reporter.report(&attempt_id, kind) {
                Ok(ack) => {
                    match ack.instruction() {
                        Some(instruction) => log::info!(
                            "Violation #{} recorded for attempt {attempt_id}: {:?}",
                            instruction.count,
                            instruction.action
                        ),
                        None => log::info!("Violation recorded for attempt {attempt_id}"),
                    }
                    if let Some(handler) = on_response {
                        handler(&ack);
                    }
                }
                Err(e) => log::warn!("Failed to report violation for attempt {attempt_id}: {e}"),
            }
        }))
    }
}
