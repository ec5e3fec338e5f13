// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! One control cycle: signals in, command and announcements out

use std::time::{Duration, Instant};

use eyedrive_config::EyedriveConfig;
use image::GrayImage;
use tracing::{debug, trace};

use crate::announce::AnnouncementRequest;
use crate::eye_state::{ClosureState, EyeStateEstimator, DEFAULT_EAR_THRESHOLD};
use crate::gaze::{GazeBucket, GazeClassifier, GazeSettings};
use crate::motion::{
    Command, CycleSignals, EyeSignal, MotionController, MotionState, Trigger, DEFAULT_TOGGLE_HOLD,
};
use crate::obstacle::{ObstacleMonitor, ObstacleSettings, ZoneReading};
use crate::signals::DetectedFace;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    pub ear_threshold: f32,
    pub toggle_hold: Duration,
    pub gaze: GazeSettings,
    pub obstacle: ObstacleSettings,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            toggle_hold: DEFAULT_TOGGLE_HOLD,
            gaze: GazeSettings::default(),
            obstacle: ObstacleSettings::default(),
        }
    }
}

impl From<&EyedriveConfig> for CoreSettings {
    fn from(config: &EyedriveConfig) -> Self {
        Self {
            ear_threshold: config.vision.ear_threshold,
            toggle_hold: Duration::from_millis(config.motion.toggle_hold_ms),
            gaze: GazeSettings::from(&config.vision),
            obstacle: ObstacleSettings::from(&config.obstacle),
        }
    }
}

impl CoreSettings {
    /// Reject settings under which the rules cannot fire as intended
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.ear_threshold > 0.0 && self.ear_threshold < 1.0) {
            return Err(CoreError::InvalidSettings(format!(
                "EAR threshold {} outside (0, 1)",
                self.ear_threshold
            )));
        }
        if self.toggle_hold.is_zero() {
            return Err(CoreError::InvalidSettings(
                "toggle hold must be longer than zero".to_string(),
            ));
        }
        let obstacle = &self.obstacle;
        if !(obstacle.blocked_below >= 0.0 && obstacle.blocked_below <= obstacle.warning_up_to) {
            return Err(CoreError::InvalidSettings(format!(
                "blocked limit {} must not exceed warning limit {}",
                obstacle.blocked_below, obstacle.warning_up_to
            )));
        }
        let gaze = &self.gaze;
        if !(gaze.left_fraction > 0.0
            && gaze.left_fraction < gaze.right_fraction
            && gaze.right_fraction < 1.0)
        {
            return Err(CoreError::InvalidSettings(format!(
                "gaze fractions {} / {} must satisfy 0 < left < right < 1",
                gaze.left_fraction, gaze.right_fraction
            )));
        }
        if gaze.work_width == 0 || gaze.work_height == 0 {
            return Err(CoreError::InvalidSettings(
                "gaze work area must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one cycle produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutput {
    /// At most one command per cycle
    pub command: Option<Command>,
    /// In the order they should be spoken
    pub announcements: Vec<AnnouncementRequest>,
    pub zone: ZoneReading,
    pub eyes: EyeSignal,
    pub trigger: Option<Trigger>,
}

impl CycleOutput {
    /// Set when the proximity zone changed this cycle
    pub fn zone_change(&self) -> Option<(crate::ProximityZone, crate::ProximityZone)> {
        self.zone
            .changed
            .then_some((self.zone.previous, self.zone.zone))
    }

    pub fn face_present(&self) -> bool {
        matches!(self.eyes, EyeSignal::Present { .. })
    }
}

/// Owns the estimator, classifier, monitor and controller
#[derive(Debug, Clone)]
pub struct ControlCore {
    estimator: EyeStateEstimator,
    classifier: GazeClassifier,
    monitor: ObstacleMonitor,
    controller: MotionController,
}

impl Default for ControlCore {
    fn default() -> Self {
        Self::new(CoreSettings::default())
    }
}

impl ControlCore {
    pub fn new(settings: CoreSettings) -> Self {
        Self {
            estimator: EyeStateEstimator::new(settings.ear_threshold),
            classifier: GazeClassifier::new(settings.gaze),
            monitor: ObstacleMonitor::new(settings.obstacle),
            controller: MotionController::new(settings.toggle_hold),
        }
    }

    /// Build from configuration, rejecting unusable settings
    pub fn from_config(config: &EyedriveConfig) -> CoreResult<Self> {
        let settings = CoreSettings::from(config);
        settings.validate()?;
        Ok(Self::new(settings))
    }

    /// Run one cycle
    ///
    /// Only the first face is used. With no face the eye state is left
    /// untouched and only the obstacle rule runs. `raw_distance` of `None`
    /// means the ranging request failed.
    pub fn step(
        &mut self,
        frame: &GrayImage,
        faces: &[DetectedFace],
        raw_distance: Option<f32>,
        now: Instant,
    ) -> CycleOutput {
        if faces.len() > 1 {
            trace!(target: "eyedrive_core", "{} faces detected, using the first", faces.len());
        }

        let eyes = match faces.first() {
            Some(face) => {
                let closure = self.estimator.update(face, now);
                let gaze = face
                    .gaze_hint
                    .unwrap_or_else(|| self.classifier.classify(frame, face));
                EyeSignal::Present { closure, gaze }
            }
            None => EyeSignal::Absent,
        };

        let zone = self.monitor.observe(raw_distance);
        let decision = self.controller.evaluate(&CycleSignals { eyes, zone });
        if decision.gesture_consumed {
            self.estimator.acknowledge_gesture();
        }

        if let Some(command) = decision.command {
            debug!(target: "eyedrive_core", "Cycle command {} ({:?})", command, decision.trigger);
        }

        CycleOutput {
            command: decision.command,
            announcements: decision.announcements,
            zone,
            eyes,
            trigger: decision.trigger,
        }
    }

    pub fn closure_state(&self) -> &ClosureState {
        self.estimator.state()
    }

    pub fn motion_state(&self) -> &MotionState {
        self.controller.state()
    }

    pub fn zone(&self) -> crate::ProximityZone {
        self.monitor.last_zone()
    }

    /// Gaze of the face without running a cycle
    pub fn classify_gaze(&self, frame: &GrayImage, face: &DetectedFace) -> GazeBucket {
        face.gaze_hint
            .unwrap_or_else(|| self.classifier.classify(frame, face))
    }
}
