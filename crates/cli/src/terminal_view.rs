use std::io::{self, Write};

use proctorwatch_core::presence::domain::presence_state::PresenceStatus;
use proctorwatch_core::presentation::domain::status_text::{self, Locale, StatusTone};
use proctorwatch_core::presentation::domain::status_view::StatusView;
use proctorwatch_core::shared::bounding_box::BoundingBox;

/// Renders the status as a single line on a terminal, rewritten in place.
pub struct TerminalStatusView<W: Write + Send = io::Stderr> {
    out: W,
    locale: Locale,
    faces: usize,
    /// Whether the cursor sits at the end of a status line.
    in_line: bool,
}

impl TerminalStatusView {
    pub fn new(locale: Locale) -> Self {
        Self::with_writer(io::stderr(), locale)
    }
}

impl<W: Write + Send> TerminalStatusView<W> {
    pub fn with_writer(out: W, locale: Locale) -> Self {
        Self {
            out,
            locale,
            faces: 0,
            in_line: false,
        }
    }

    fn rewrite(&mut self, line: &str) {
        let _ = write!(self.out, "\r\x1b[2K{line}");
        let _ = self.out.flush();
        self.in_line = true;
    }

    fn end_line(&mut self) {
        if self.in_line {
            let _ = writeln!(self.out);
            self.in_line = false;
        }
    }
}

fn marker(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Ok => "[ok]",
        StatusTone::Warning => "[!!]",
        StatusTone::Danger => "[XX]",
    }
}

impl<W: Write + Send> StatusView for TerminalStatusView<W> {
    fn show_status(&mut self, status: PresenceStatus, seconds_remaining: Option<f64>) {
        if status != PresenceStatus::Present {
            self.faces = 0;
        }
        let text = status_text::status_message(self.locale, status, seconds_remaining);
        let mut line = format!("{} {text}", marker(StatusTone::for_status(status)));
        if status == PresenceStatus::Present && self.faces > 1 {
            line.push_str(&format!(" ({} faces)", self.faces));
        }
        self.rewrite(&line);
        if status == PresenceStatus::Violated {
            // Keep violations in the scrollback.
            self.end_line();
        }
    }

    fn show_faces(&mut self, boxes: &[BoundingBox], _frame_width: u32, _frame_height: u32) {
        self.faces = boxes.len();
    }

    fn show_error(&mut self, message: &str) {
        self.end_line();
        let _ = writeln!(
            self.out,
            "{}: {message}",
            status_text::error_title(self.locale)
        );
    }

    fn show_notice(&mut self, message: &str) {
        self.rewrite(message);
    }

    fn clear(&mut self) {
        self.faces = 0;
        if self.in_line {
            let _ = write!(self.out, "\r\x1b[2K");
            let _ = self.out.flush();
            self.in_line = false;
        }
    }
}
