use std::time::Instant;

use crate::shared::bounding_box::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceStatus {
    Present,
    /// Face absent, still below the warning threshold.
    Searching,
    /// Face absent past the warning threshold; countdown running.
    Warning,
    /// Face absent for the full missing threshold.
    Violated,
}

/// Mutable core of presence tracking.
///
/// Mutated only by the detection loop tick that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceState {
    pub status: PresenceStatus,
    /// Start of the current absence window. Re-armed on every violation.
    pub missing_since: Option<Instant>,
    /// Set once the warning fired in the current window.
    pub warning_acknowledged: bool,
}

impl PresenceState {
    pub fn new() -> Self {
        Self {
            status: PresenceStatus::Present,
            missing_since: None,
            warning_acknowledged: false,
        }
    }
}

impl Default for PresenceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one detection tick. Dropped once the tick is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSample {
    pub present: bool,
    pub boxes: Vec<BoundingBox>,
    pub timestamp: Instant,
}

impl DetectionSample {
    /// Presence is boolean: any number of faces counts as present.
    pub fn from_boxes(boxes: Vec<BoundingBox>, timestamp: Instant) -> Self {
        Self {
            present: !boxes.is_empty(),
            boxes,
            timestamp,
        }
    }

    pub fn absent(timestamp: Instant) -> Self {
        Self::from_boxes(Vec::new(), timestamp)
    }
}
