// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Wheelchair motion state machine
//!
//! Rules are evaluated in priority order and the first rule that issues a
//! command ends the cycle, so at most one command leaves per cycle:
//!
//! 1. **Obstacle stop**: BLOCKED while moving forces STOP.
//! 2. **Blink toggle**: eyes held shut for the toggle hold flips STOPPED and
//!    MOVING. Starting is refused while BLOCKED.
//! 3. **Eyes-open resume**: while STOPPED, reopening after a closure shorter
//!    than the hold starts the chair.
//! 4. **Gaze steering**: while MOVING, the gaze bucket selects the direction.
//!    A command equal to the last one sent is suppressed.
//!
//! Zone transitions produce their own announcements independent of the rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::announce::AnnouncementRequest;
use crate::eye_state::ClosureReading;
use crate::gaze::GazeBucket;
use crate::obstacle::{ProximityZone, ZoneReading};
use crate::phrases;

pub const DEFAULT_TOGGLE_HOLD: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Forward,
    Stop,
    Left,
    Right,
}

impl Command {
    /// Byte sent to the motor board
    pub fn wire_byte(self) -> u8 {
        match self {
            Command::Forward => b'F',
            Command::Stop => b'S',
            Command::Left => b'L',
            Command::Right => b'R',
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            b'F' => Some(Command::Forward),
            b'S' => Some(Command::Stop),
            b'L' => Some(Command::Left),
            b'R' => Some(Command::Right),
            _ => None,
        }
    }

    pub fn from_gaze(gaze: GazeBucket) -> Self {
        match gaze {
            GazeBucket::Left => Command::Left,
            GazeBucket::Center => Command::Forward,
            GazeBucket::Right => Command::Right,
        }
    }

    fn steering_phrase(self) -> &'static str {
        match self {
            Command::Left => phrases::TURNING_LEFT,
            Command::Right => phrases::TURNING_RIGHT,
            _ => phrases::MOVING_FORWARD,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_byte() as char)
    }
}

/// `last_command` is `None` until the first command is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionState {
    pub moving: bool,
    pub last_command: Option<Command>,
}

/// Eye-derived inputs of one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EyeSignal {
    /// No face this cycle
    Absent,
    Present {
        closure: ClosureReading,
        gaze: GazeBucket,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSignals {
    pub eyes: EyeSignal,
    pub zone: ZoneReading,
}

/// Which rule produced the cycle's command (or refusal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    ObstacleStop,
    BlinkStart,
    BlinkStop,
    /// Start gesture while BLOCKED; acknowledged, no command
    BlinkStartRefused,
    EyesOpenResume,
    Steer,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decision {
    pub command: Option<Command>,
    pub announcements: Vec<AnnouncementRequest>,
    /// The closure in progress was consumed and must be acknowledged
    pub gesture_consumed: bool,
    pub trigger: Option<Trigger>,
}

#[derive(Debug, Clone)]
pub struct MotionController {
    state: MotionState,
    toggle_hold: Duration,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(DEFAULT_TOGGLE_HOLD)
    }
}

impl MotionController {
    pub fn new(toggle_hold: Duration) -> Self {
        Self {
            state: MotionState::default(),
            toggle_hold,
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn toggle_hold(&self) -> Duration {
        self.toggle_hold
    }

    /// Apply the rules to one cycle's signals
    pub fn evaluate(&mut self, signals: &CycleSignals) -> Decision {
        let mut decision = Decision::default();
        let zone = signals.zone.zone;

        if signals.zone.changed && zone == ProximityZone::Warning {
            decision
                .announcements
                .push(AnnouncementRequest::safety(phrases::OBSTACLE_AHEAD));
        }

        if zone == ProximityZone::Blocked && self.state.moving {
            warn!(target: "eyedrive_core", "Obstacle in path, stopping");
            // a closure held through the stop must not later count as a start
            decision.gesture_consumed = matches!(
                signals.eyes,
                EyeSignal::Present { closure, .. } if closure.is_closed
            );
            self.issue(&mut decision, Command::Stop, Trigger::ObstacleStop);
            decision
                .announcements
                .push(AnnouncementRequest::safety(phrases::OBSTACLE_STOP));
            return decision;
        }

        let EyeSignal::Present { closure, gaze } = signals.eyes else {
            return decision;
        };

        if closure.is_closed && closure.elapsed_closed >= self.toggle_hold {
            decision.gesture_consumed = true;
            if self.state.moving {
                info!(target: "eyedrive_core", "Blink toggle: stop");
                self.issue(&mut decision, Command::Stop, Trigger::BlinkStop);
                decision
                    .announcements
                    .push(AnnouncementRequest::normal(phrases::STOPPING));
            } else if zone == ProximityZone::Blocked {
                warn!(target: "eyedrive_core", "Blink toggle refused: obstacle ahead");
                decision.trigger = Some(Trigger::BlinkStartRefused);
                decision
                    .announcements
                    .push(AnnouncementRequest::safety(phrases::OBSTACLE_AHEAD));
            } else {
                info!(target: "eyedrive_core", "Blink toggle: start");
                self.issue(&mut decision, Command::Forward, Trigger::BlinkStart);
                decision
                    .announcements
                    .push(AnnouncementRequest::normal(phrases::STARTING));
            }
            return decision;
        }

        if !self.state.moving && !closure.is_closed {
            if let Some(length) = closure.reopened_after {
                if length < self.toggle_hold {
                    if zone == ProximityZone::Blocked {
                        debug!(target: "eyedrive_core", "Eyes-open resume refused: obstacle ahead");
                    } else {
                        info!(target: "eyedrive_core", "Eyes reopened after {:?}, resuming", length);
                        self.issue(&mut decision, Command::Forward, Trigger::EyesOpenResume);
                        decision
                            .announcements
                            .push(AnnouncementRequest::normal(phrases::STARTING));
                        return decision;
                    }
                }
            }
        }

        if self.state.moving {
            let command = Command::from_gaze(gaze);
            if self.state.last_command != Some(command) {
                debug!(target: "eyedrive_core", "Gaze {} -> {:?}", gaze, command);
                self.issue(&mut decision, command, Trigger::Steer);
                decision
                    .announcements
                    .push(AnnouncementRequest::normal(command.steering_phrase()));
            }
        }

        decision
    }

    fn issue(&mut self, decision: &mut Decision, command: Command, trigger: Trigger) {
        self.state.moving = command != Command::Stop;
        self.state.last_command = Some(command);
        decision.command = Some(command);
        decision.trigger = Some(trigger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::Priority;

    fn zone(zone: ProximityZone, previous: ProximityZone) -> ZoneReading {
        ZoneReading {
            zone,
            previous,
            changed: zone != previous,
            sensor_failed: false,
        }
    }

    fn clear() -> ZoneReading {
        zone(ProximityZone::Clear, ProximityZone::Clear)
    }

    fn open(gaze: GazeBucket) -> EyeSignal {
        EyeSignal::Present {
            closure: ClosureReading {
                ear: 0.3,
                is_closed: false,
                elapsed_closed: Duration::ZERO,
                reopened_after: None,
            },
            gaze,
        }
    }

    fn closed_for(ms: u64) -> EyeSignal {
        EyeSignal::Present {
            closure: ClosureReading {
                ear: 0.1,
                is_closed: true,
                elapsed_closed: Duration::from_millis(ms),
                reopened_after: None,
            },
            gaze: GazeBucket::Center,
        }
    }

    fn reopened_after(ms: u64) -> EyeSignal {
        EyeSignal::Present {
            closure: ClosureReading {
                ear: 0.3,
                is_closed: false,
                elapsed_closed: Duration::ZERO,
                reopened_after: Some(Duration::from_millis(ms)),
            },
            gaze: GazeBucket::Center,
        }
    }

    fn moving_controller() -> MotionController {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(1600),
            zone: clear(),
        });
        assert_eq!(decision.command, Some(Command::Forward));
        controller
    }

    #[test]
    fn test_wire_bytes() {
        assert_eq!(Command::Forward.wire_byte(), b'F');
        assert_eq!(Command::Stop.wire_byte(), b'S');
        assert_eq!(Command::Left.wire_byte(), b'L');
        assert_eq!(Command::Right.wire_byte(), b'R');
        assert_eq!(Command::from_wire(b'L'), Some(Command::Left));
        assert_eq!(Command::from_wire(b'G'), None);
    }

    #[test]
    fn test_blink_toggle_starts() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(1500),
            zone: clear(),
        });
        assert_eq!(decision.command, Some(Command::Forward));
        assert_eq!(decision.trigger, Some(Trigger::BlinkStart));
        assert!(decision.gesture_consumed);
        assert_eq!(decision.announcements[0].text, "Starting the wheelchair");
        assert!(controller.state().moving);
    }

    #[test]
    fn test_obstacle_stop_consumes_closure_in_progress() {
        let mut controller = moving_controller();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(700),
            zone: zone(ProximityZone::Blocked, ProximityZone::Clear),
        });
        assert_eq!(decision.trigger, Some(Trigger::ObstacleStop));
        assert!(decision.gesture_consumed);

        let mut controller = moving_controller();
        let decision = controller.evaluate(&CycleSignals {
            eyes: open(GazeBucket::Center),
            zone: zone(ProximityZone::Blocked, ProximityZone::Clear),
        });
        assert_eq!(decision.trigger, Some(Trigger::ObstacleStop));
        assert!(!decision.gesture_consumed);
    }

    #[test]
    fn test_short_closure_does_nothing_while_closed() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(1499),
            zone: clear(),
        });
        assert_eq!(decision, Decision::default());
    }

    #[test]
    fn test_blink_toggle_stops() {
        let mut controller = moving_controller();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(2000),
            zone: clear(),
        });
        assert_eq!(decision.command, Some(Command::Stop));
        assert_eq!(decision.announcements[0].text, "Stopping the wheelchair");
        assert!(!controller.state().moving);
    }

    #[test]
    fn test_obstacle_stop_preempts_everything() {
        let mut controller = moving_controller();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(5000),
            zone: zone(ProximityZone::Blocked, ProximityZone::Warning),
        });
        assert_eq!(decision.command, Some(Command::Stop));
        assert_eq!(decision.trigger, Some(Trigger::ObstacleStop));
        assert!(!decision.gesture_consumed);
        assert_eq!(
            decision.announcements,
            vec![AnnouncementRequest::safety("Stopping the wheelchair.")]
        );
    }

    #[test]
    fn test_obstacle_stop_runs_without_face() {
        let mut controller = moving_controller();
        let decision = controller.evaluate(&CycleSignals {
            eyes: EyeSignal::Absent,
            zone: zone(ProximityZone::Blocked, ProximityZone::Clear),
        });
        assert_eq!(decision.command, Some(Command::Stop));
    }

    #[test]
    fn test_blocked_while_stopped_is_silent() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: open(GazeBucket::Center),
            zone: zone(ProximityZone::Blocked, ProximityZone::Warning),
        });
        assert_eq!(decision, Decision::default());
    }

    #[test]
    fn test_start_refused_while_blocked() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: closed_for(1600),
            zone: zone(ProximityZone::Blocked, ProximityZone::Blocked),
        });
        assert_eq!(decision.command, None);
        assert!(decision.gesture_consumed);
        assert_eq!(decision.trigger, Some(Trigger::BlinkStartRefused));
        assert_eq!(decision.announcements[0].priority, Priority::Safety);
        assert!(!controller.state().moving);
    }

    #[test]
    fn test_eyes_open_resume_after_short_closure() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: reopened_after(400),
            zone: clear(),
        });
        assert_eq!(decision.command, Some(Command::Forward));
        assert_eq!(decision.trigger, Some(Trigger::EyesOpenResume));
    }

    #[test]
    fn test_eyes_open_resume_refused_while_blocked() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: reopened_after(400),
            zone: zone(ProximityZone::Blocked, ProximityZone::Blocked),
        });
        assert_eq!(decision.command, None);
    }

    #[test]
    fn test_steady_open_eyes_do_not_start() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: open(GazeBucket::Left),
            zone: clear(),
        });
        assert_eq!(decision.command, None);
    }

    #[test]
    fn test_gaze_steering_suppresses_repeats() {
        let mut controller = moving_controller();
        let signals = |gaze| CycleSignals {
            eyes: open(gaze),
            zone: clear(),
        };

        // last command is already F
        assert_eq!(controller.evaluate(&signals(GazeBucket::Center)).command, None);

        let decision = controller.evaluate(&signals(GazeBucket::Left));
        assert_eq!(decision.command, Some(Command::Left));
        assert_eq!(decision.announcements[0].text, "Turning Left");
        assert_eq!(controller.evaluate(&signals(GazeBucket::Left)).command, None);

        let decision = controller.evaluate(&signals(GazeBucket::Right));
        assert_eq!(decision.command, Some(Command::Right));
        assert_eq!(decision.announcements[0].text, "Turning Right");

        let decision = controller.evaluate(&signals(GazeBucket::Center));
        assert_eq!(decision.command, Some(Command::Forward));
        assert_eq!(decision.announcements[0].text, "Moving Forward");
    }

    #[test]
    fn test_warning_edge_announces_once() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: EyeSignal::Absent,
            zone: zone(ProximityZone::Warning, ProximityZone::Clear),
        });
        assert_eq!(
            decision.announcements,
            vec![AnnouncementRequest::safety("Obstacle ahead.")]
        );

        let decision = controller.evaluate(&CycleSignals {
            eyes: EyeSignal::Absent,
            zone: zone(ProximityZone::Warning, ProximityZone::Warning),
        });
        assert!(decision.announcements.is_empty());
    }

    #[test]
    fn test_clear_edge_is_silent() {
        let mut controller = MotionController::default();
        let decision = controller.evaluate(&CycleSignals {
            eyes: EyeSignal::Absent,
            zone: zone(ProximityZone::Clear, ProximityZone::Warning),
        });
        assert_eq!(decision, Decision::default());
    }
}
