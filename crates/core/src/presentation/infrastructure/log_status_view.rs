use crate::presence::domain::presence_state::PresenceStatus;
use crate::presentation::domain::overlay::OverlayRect;
use crate::presentation::domain::status_text::{self, Locale, StatusTone};
use crate::presentation::domain::status_view::StatusView;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{PREVIEW_HEIGHT, PREVIEW_WIDTH};

/// View that renders status lines through the `log` crate.
///
/// Status changes are logged at info (warn for violations); repeated
/// statuses such as the per-tick countdown go to debug to keep the log
/// readable over a long attempt.
pub struct LogStatusView {
    locale: Locale,
    last_status: Option<PresenceStatus>,
    last_line: Option<String>,
    last_overlay: Option<OverlayRect>,
}

impl LogStatusView {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            last_status: None,
            last_line: None,
            last_overlay: None,
        }
    }

    /// The most recently rendered status or error line.
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    pub fn last_overlay(&self) -> Option<OverlayRect> {
        self.last_overlay
    }
}

impl Default for LogStatusView {
    fn default() -> Self {
        Self::new(Locale::English)
    }
}

impl StatusView for LogStatusView {
    fn show_status(&mut self, status: PresenceStatus, seconds_remaining: Option<f64>) {
        let line = status_text::status_message(self.locale, status, seconds_remaining);
        if self.last_status == Some(status) {
            log::debug!("{line}");
        } else if StatusTone::for_status(status) == StatusTone::Danger {
            log::warn!("{line}");
        } else {
            log::info!("{line}");
        }
        if status != PresenceStatus::Present {
            self.last_overlay = None;
        }
        self.last_status = Some(status);
        self.last_line = Some(line);
    }

    fn show_faces(&mut self, boxes: &[BoundingBox], frame_width: u32, frame_height: u32) {
        self.last_overlay =
            OverlayRect::for_first_face(boxes, frame_width, frame_height, PREVIEW_WIDTH, PREVIEW_HEIGHT);
        if let Some(rect) = self.last_overlay {
            log::debug!(
                "{} face(s), overlay at ({:.0}, {:.0}) {:.0}x{:.0}",
                boxes.len(),
                rect.x,
                rect.y,
                rect.width,
                rect.height
            );
        }
    }

    fn show_error(&mut self, message: &str) {
        let line = format!("{}: {message}", status_text::error_title(self.locale));
        log::error!("{line}");
        self.last_line = Some(line);
    }

    fn show_notice(&mut self, message: &str) {
        log::info!("{message}");
        self.last_line = Some(message.to_string());
    }

    fn clear(&mut self) {
        self.last_status = None;
        self.last_line = None;
        self.last_overlay = None;
    }
}
