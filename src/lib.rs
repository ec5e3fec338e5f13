// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EyeDrive - gaze and blink driven wheelchair control
//!
//! EyeDrive turns eye landmarks and an ultrasonic distance reading into
//! motor commands for an Arduino-driven wheelchair, and speaks what it is doing.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! eyedrive = "0.1"  # Default: decision core + runtime
//! ```
//!
//! ## Feature Flags
//!
//! - **`runtime`** (default): control loop, session replay and host hardware
//! - **`file-logging`**: JSON log files in per-run folders
//!
//! ## Usage
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use eyedrive::prelude::*;
//! use image::GrayImage;
//!
//! let eye = |open: f32| [
//!     Point::new(0.0, 0.0), Point::new(3.0, -open), Point::new(7.0, -open),
//!     Point::new(10.0, 0.0), Point::new(7.0, open), Point::new(3.0, open),
//! ];
//! let closed = DetectedFace::new(eye(0.5), eye(0.5)).with_gaze_hint(GazeBucket::Center);
//!
//! let mut core = ControlCore::default();
//! let frame = GrayImage::new(64, 64);
//! let t0 = Instant::now();
//!
//! core.step(&frame, &[closed.clone()], Some(120.0), t0);
//! let output = core.step(&frame, &[closed], Some(120.0), t0 + Duration::from_millis(1600));
//! assert_eq!(output.command, Some(Command::Forward));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: eyedrive-config, eyedrive-observability    │
//! │  (TOML config, logging, debug flags)                    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Hardware: eyedrive-hal                                 │
//! │  (serial link, ranging, speech sinks)                   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Decision core: eyedrive-core                           │
//! │  (eye state, gaze, obstacle zones, motion rules)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Runtime: eyedrive-runtime                              │
//! │  (control loop, session replay, `eyedrive` binary)      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub use eyedrive_config as config;
pub use eyedrive_core as control;
pub use eyedrive_hal as hal;
pub use eyedrive_observability as observability;

#[cfg(feature = "runtime")]
pub use eyedrive_runtime as runtime;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config_or_default, EyedriveConfig};
    pub use crate::control::{
        AnnouncementGate, AnnouncementRequest, Command, ControlCore, CoreSettings, CycleOutput,
        DetectedFace, GazeBucket, Point, Priority, ProximityZone, SignalExtractor, SpeechWorker,
    };
    pub use crate::hal::{CommandSink, RangeSensor, SpeechSink};

    #[cfg(feature = "runtime")]
    pub use crate::runtime::{ControlLoop, FrameSource, LoopSettings, Session, StopReason};
}
