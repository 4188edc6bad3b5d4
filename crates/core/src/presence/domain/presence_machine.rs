use std::time::Duration;

use crate::presence::domain::presence_effect::{PresenceEffect, ViolationEvent, ViolationKind};
use crate::presence::domain::presence_state::{DetectionSample, PresenceState, PresenceStatus};
use crate::shared::config::PresenceConfig;

/// New state plus the effects to apply, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PresenceState,
    pub effects: Vec<PresenceEffect>,
}

/// Turns per-tick presence samples into a presence status with a warning
/// countdown and periodic violations.
///
/// `advance` is a pure function of the previous state and the sample; the
/// sample's timestamp is "now". Nothing here touches a clock, a camera or
/// the network, so every timing rule can be driven with synthetic
/// timestamps.
#[derive(Debug, Clone)]
pub struct PresenceMachine {
    attempt_id: String,
    missing_threshold: Duration,
    warning_threshold: Duration,
}

impl PresenceMachine {
    /// Expects a validated configuration (warning below missing).
    pub fn new(attempt_id: impl Into<String>, config: &PresenceConfig) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            missing_threshold: config.missing_threshold(),
            warning_threshold: config.warning_threshold(),
        }
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn advance(&self, state: &PresenceState, sample: &DetectionSample) -> Transition {
        if sample.present {
            return Transition {
                state: PresenceState::new(),
                effects: vec![PresenceEffect::UpdateStatusDisplay {
                    status: PresenceStatus::Present,
                    seconds_remaining: None,
                }],
            };
        }

        let now = sample.timestamp;
        let missing_since = state.missing_since.unwrap_or(now);
        let elapsed = now.saturating_duration_since(missing_since);

        if elapsed >= self.missing_threshold {
            // Re-arm so continued absence fires again one full window later.
            let next = PresenceState {
                status: PresenceStatus::Violated,
                missing_since: Some(now),
                warning_acknowledged: false,
            };
            let event = ViolationEvent {
                attempt_id: self.attempt_id.clone(),
                kind: ViolationKind::FaceNotDetected,
                timestamp: now,
            };
            return Transition {
                state: next,
                effects: vec![
                    PresenceEffect::UpdateStatusDisplay {
                        status: PresenceStatus::Violated,
                        seconds_remaining: None,
                    },
                    PresenceEffect::EmitViolation(event),
                ],
            };
        }

        if elapsed < self.warning_threshold {
            return Transition {
                state: PresenceState {
                    status: PresenceStatus::Searching,
                    missing_since: Some(missing_since),
                    warning_acknowledged: state.warning_acknowledged,
                },
                effects: vec![PresenceEffect::UpdateStatusDisplay {
                    status: PresenceStatus::Searching,
                    seconds_remaining: None,
                }],
            };
        }

        // Between the thresholds: the first tick acknowledges the warning,
        // later ticks only refresh the countdown.
        let remaining = (self.missing_threshold - elapsed).as_secs_f64();
        Transition {
            state: PresenceState {
                status: PresenceStatus::Warning,
                missing_since: Some(missing_since),
                warning_acknowledged: true,
            },
            effects: vec![PresenceEffect::UpdateStatusDisplay {
                status: PresenceStatus::Warning,
                seconds_remaining: Some(remaining),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Instant;

    fn machine(missing: f64, warning: f64) -> PresenceMachine {
        let config = PresenceConfig {
            missing_threshold_seconds: missing,
            warning_threshold_seconds: warning,
            ..PresenceConfig::default()
        };
        PresenceMachine::new("attempt-42", &config)
    }

    fn face() -> BoundingBox {
        BoundingBox {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
            confidence: 0.9,
        }
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    fn present(ts: Instant) -> DetectionSample {
        DetectionSample::from_boxes(vec![face()], ts)
    }

    fn absent(ts: Instant) -> DetectionSample {
        DetectionSample::absent(ts)
    }

    fn violations(effects: &[PresenceEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, PresenceEffect::EmitViolation(_)))
            .count()
    }

    fn displayed(effects: &[PresenceEffect]) -> (PresenceStatus, Option<f64>) {
        effects
            .iter()
            .find_map(|e| match e {
                PresenceEffect::UpdateStatusDisplay {
                    status,
                    seconds_remaining,
                } => Some((*status, *seconds_remaining)),
                _ => None,
            })
            .expect("every tick updates the display")
    }

    // ── Presence ─────────────────────────────────────────────────────

    #[test]
    fn test_face_present_resets_everything() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let state = PresenceState {
            status: PresenceStatus::Warning,
            missing_since: Some(t0),
            warning_acknowledged: true,
        };

        let t = m.advance(&state, &present(at(t0, 7)));

        assert_eq!(t.state, PresenceState::new());
        assert_eq!(
            t.effects,
            vec![PresenceEffect::UpdateStatusDisplay {
                status: PresenceStatus::Present,
                seconds_remaining: None,
            }]
        );
    }

    #[test]
    fn test_multiple_faces_count_as_present() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let sample = DetectionSample::from_boxes(vec![face(), face(), face()], t0);
        let t = m.advance(&PresenceState::new(), &sample);
        assert_eq!(t.state.status, PresenceStatus::Present);
        assert_eq!(violations(&t.effects), 0);
    }

    // ── Absence episode ──────────────────────────────────────────────

    #[test]
    fn test_first_absent_tick_starts_episode() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let t = m.advance(&PresenceState::new(), &absent(t0));
        assert_eq!(t.state.status, PresenceStatus::Searching);
        assert_eq!(t.state.missing_since, Some(t0));
        assert_eq!(displayed(&t.effects), (PresenceStatus::Searching, None));
    }

    #[test]
    fn test_reference_scenario_two_second_ticks() {
        // missing=10s, warning=5s, ticks every 2s, absent from t=0.
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let mut state = PresenceState::new();
        let mut observed = Vec::new();

        for secs in [0, 2, 4, 6, 8, 10] {
            let prev_ack = state.warning_acknowledged;
            let t = m.advance(&state, &absent(at(t0, secs)));
            observed.push((secs, t.state.status, prev_ack, t.effects.clone()));
            state = t.state;
        }

        for (secs, status, _, effects) in &observed[0..3] {
            assert_eq!(*status, PresenceStatus::Searching, "t={secs}");
            assert_eq!(violations(effects), 0);
        }

        // t=6: warning transition fires
        let (_, status, prev_ack, effects) = &observed[3];
        assert_eq!(*status, PresenceStatus::Warning);
        assert!(!prev_ack);
        let (_, remaining) = displayed(effects);
        assert_relative_eq!(remaining.unwrap(), 4.0);

        // t=8: already acknowledged, countdown keeps updating
        let (_, status, prev_ack, effects) = &observed[4];
        assert_eq!(*status, PresenceStatus::Warning);
        assert!(*prev_ack);
        let (_, remaining) = displayed(effects);
        assert_relative_eq!(remaining.unwrap(), 2.0);

        // t=10: violation, re-armed at t=10
        let (_, status, _, effects) = &observed[5];
        assert_eq!(*status, PresenceStatus::Violated);
        assert_eq!(violations(effects), 1);
        assert_eq!(state.missing_since, Some(at(t0, 10)));
        assert!(!state.warning_acknowledged);
    }

    #[test]
    fn test_violation_displays_before_emitting() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let state = PresenceState {
            status: PresenceStatus::Warning,
            missing_since: Some(t0),
            warning_acknowledged: true,
        };

        let t = m.advance(&state, &absent(at(t0, 10)));

        assert_eq!(t.effects.len(), 2);
        assert_eq!(
            t.effects[0],
            PresenceEffect::UpdateStatusDisplay {
                status: PresenceStatus::Violated,
                seconds_remaining: None,
            }
        );
        match &t.effects[1] {
            PresenceEffect::EmitViolation(event) => {
                assert_eq!(event.attempt_id, "attempt-42");
                assert_eq!(event.kind, ViolationKind::FaceNotDetected);
                assert_eq!(event.timestamp, at(t0, 10));
            }
            other => panic!("expected violation, got {other:?}"),
        }
    }

    #[test]
    fn test_sustained_absence_violates_once_per_window() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let mut state = PresenceState::new();
        let mut fired_at = Vec::new();

        for secs in 0..=45 {
            let t = m.advance(&state, &absent(at(t0, secs)));
            if violations(&t.effects) > 0 {
                fired_at.push(secs);
            }
            assert!(violations(&t.effects) <= 1);
            state = t.state;
        }

        assert_eq!(fired_at, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_warning_transition_once_per_window() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let mut state = PresenceState::new();
        let mut warning_entries = Vec::new();

        for secs in 0..=25 {
            let t = m.advance(&state, &absent(at(t0, secs)));
            if !state.warning_acknowledged && t.state.warning_acknowledged {
                warning_entries.push(secs);
            }
            state = t.state;
        }

        // one per re-armed window: 5, 15 (re-armed at 10), 25 (re-armed at 20)
        assert_eq!(warning_entries, vec![5, 15, 25]);
    }

    #[test]
    fn test_presence_aborts_countdown_without_stale_violation() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let mut state = PresenceState::new();

        for secs in [0, 3, 6, 9] {
            state = m.advance(&state, &absent(at(t0, secs))).state;
        }
        assert_eq!(state.status, PresenceStatus::Warning);

        state = m.advance(&state, &present(at(t0, 9))).state;
        assert_eq!(state.missing_since, None);

        // absence resumes at t=11; nothing may fire at t=12 even though the
        // original episode started 12s ago
        let mut total = 0;
        for secs in [11, 12, 15, 20] {
            let t = m.advance(&state, &absent(at(t0, secs)));
            total += violations(&t.effects);
            state = t.state;
        }
        assert_eq!(total, 0);
        assert_eq!(state.missing_since, Some(at(t0, 11)));

        let t = m.advance(&state, &absent(at(t0, 21)));
        assert_eq!(violations(&t.effects), 1);
    }

    #[test]
    fn test_single_long_gap_jumps_to_violation() {
        // A tick far past the missing threshold still only fires once.
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let state = m.advance(&PresenceState::new(), &absent(t0)).state;
        let t = m.advance(&state, &absent(at(t0, 95)));
        assert_eq!(violations(&t.effects), 1);
        assert_eq!(t.state.missing_since, Some(at(t0, 95)));
    }

    #[test]
    fn test_timestamp_before_episode_start_saturates() {
        let m = machine(10.0, 5.0);
        let t0 = Instant::now();
        let state = PresenceState {
            status: PresenceStatus::Searching,
            missing_since: Some(at(t0, 5)),
            warning_acknowledged: false,
        };
        let t = m.advance(&state, &absent(t0));
        assert_eq!(t.state.status, PresenceStatus::Searching);
        assert_eq!(t.state.missing_since, Some(at(t0, 5)));
    }

    #[test]
    fn test_random_sequences_only_violate_after_full_window() {
        let m = machine(10.0, 5.0);
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let t0 = Instant::now();
            let mut state = PresenceState::new();
            let mut window_start: Option<u64> = None;
            let mut now = 0u64;

            for _ in 0..200 {
                now += rng.gen_range(1..=3);
                let sample = if rng.gen_bool(0.15) {
                    present(at(t0, now))
                } else {
                    absent(at(t0, now))
                };
                let t = m.advance(&state, &sample);

                if sample.present {
                    window_start = None;
                    assert_eq!(t.state.status, PresenceStatus::Present);
                } else {
                    let start = *window_start.get_or_insert(now);
                    let fired = violations(&t.effects) == 1;
                    assert_eq!(fired, now - start >= 10, "t={now} start={start}");
                    assert_eq!(fired, t.state.status == PresenceStatus::Violated);
                    if fired {
                        window_start = Some(now);
                    }
                }
                state = t.state;
            }
        }
    }
}
