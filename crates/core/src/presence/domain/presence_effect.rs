use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::presence::domain::presence_state::PresenceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FaceNotDetected,
}

impl ViolationKind {
    /// Identifier used on the wire and in violation callbacks.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::FaceNotDetected => "face_not_detected",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolationEvent {
    pub attempt_id: String,
    pub kind: ViolationKind,
    pub timestamp: Instant,
}

/// Side effect requested by the presence state machine.
///
/// Effects are returned in the order they must be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEffect {
    UpdateStatusDisplay {
        status: PresenceStatus,
        seconds_remaining: Option<f64>,
    },
    EmitViolation(ViolationEvent),
}
