use crate::presence::domain::presence_state::PresenceStatus;
use crate::shared::bounding_box::BoundingBox;

/// Sink for everything the proctoring widget displays.
///
/// Decouples the session from a specific output mechanism (terminal,
/// GUI, log crate). Views only consume state; they never feed back into
/// presence tracking.
pub trait StatusView: Send {
    /// Presence status, with the countdown to a violation when warning.
    fn show_status(&mut self, status: PresenceStatus, seconds_remaining: Option<f64>);

    /// Faces found on the last tick, in source-frame coordinates.
    fn show_faces(&mut self, boxes: &[BoundingBox], frame_width: u32, frame_height: u32);

    /// A fatal, user-facing error (already localized).
    fn show_error(&mut self, message: &str);

    /// Neutral notice shown before the first tick. Default: no-op.
    fn show_notice(&mut self, _message: &str) {}

    /// Remove everything the view has drawn.
    fn clear(&mut self);
}

/// View that discards all output.
///
/// Used by embedders that render from violation handlers alone and by
/// tests where display output is irrelevant.
pub struct NullStatusView;

impl StatusView for NullStatusView {
    fn show_status(&mut self, _status: PresenceStatus, _seconds_remaining: Option<f64>) {}
    fn show_faces(&mut self, _boxes: &[BoundingBox], _frame_width: u32, _frame_height: u32) {}
    fn show_error(&mut self, _message: &str) {}
    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_view_all_methods_are_noop() {
        let mut view = NullStatusView;
        view.show_status(PresenceStatus::Warning, Some(3.0));
        view.show_faces(&[], 320, 240);
        view.show_error("boom");
        view.show_notice("hello");
        view.clear();
    }
}
