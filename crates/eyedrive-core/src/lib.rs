// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EyeDrive Decision Core
//!
//! Fuses eye closure, gaze direction and obstacle distance into one stream of
//! wheelchair commands and spoken announcements.
//!
//! ```text
//! frame ─► SignalExtractor ─► DetectedFace ─┬─► EyeStateEstimator ─┐
//!                                           └─► GazeClassifier ────┤
//! raw distance ─► ObstacleMonitor ─────────────────────────────────┤
//!                                                                  ▼
//!                                     MotionController ─► Command + announcements
//! ```
//!
//! [`ControlCore::step`] runs one cycle without touching hardware, so the whole
//! state machine can be driven from synthetic landmarks and distances. The
//! runtime crate forwards the returned command to a
//! [`CommandSink`](eyedrive_hal::CommandSink) and the announcements to a
//! [`SpeechWorker`].
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Instant;
//! use eyedrive_core::{ControlCore, CoreSettings};
//! use image::GrayImage;
//!
//! let mut core = ControlCore::new(CoreSettings::default());
//! let frame = GrayImage::new(640, 480);
//!
//! // No face, no obstacle: nothing happens
//! let output = core.step(&frame, &[], Some(120.0), Instant::now());
//! assert!(output.command.is_none());
//! ```

pub mod announce;
pub mod error;
pub mod eye_state;
pub mod gaze;
pub mod motion;
pub mod obstacle;
pub mod pipeline;
pub mod signals;

pub use announce::{AnnouncementGate, AnnouncementRequest, Priority, SpeechWorker};
pub use error::{CoreError, CoreResult};
pub use eye_state::{eye_aspect_ratio, ClosureReading, ClosureState, EyeStateEstimator};
pub use gaze::{GazeBucket, GazeClassifier, GazeSettings};
pub use motion::{Command, CycleSignals, Decision, EyeSignal, MotionController, MotionState, Trigger};
pub use obstacle::{ObstacleMonitor, ObstacleSettings, ProximityZone, ZoneReading};
pub use pipeline::{ControlCore, CoreSettings, CycleOutput};
pub use signals::{DetectedFace, EyeContour, Point, SignalExtractor};

/// Phrases spoken by the controller
pub mod phrases {
    pub const STARTING: &str = "Starting the wheelchair";
    pub const STOPPING: &str = "Stopping the wheelchair";
    pub const OBSTACLE_STOP: &str = "Stopping the wheelchair.";
    pub const OBSTACLE_AHEAD: &str = "Obstacle ahead.";
    pub const TURNING_LEFT: &str = "Turning Left";
    pub const TURNING_RIGHT: &str = "Turning Right";
    pub const MOVING_FORWARD: &str = "Moving Forward";
}
