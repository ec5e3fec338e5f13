// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `eyedrive.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EyedriveConfig {
    pub system: SystemConfig,
    pub serial: SerialConfig,
    pub vision: VisionConfig,
    pub motion: MotionConfig,
    pub obstacle: ObstacleConfig,
    pub speech: SpeechConfig,
    pub control_loop: ControlLoopConfig,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

/// Serial link to the actuator / ranging board
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device node of the actuator board (e.g. `/dev/ttyACM0`, `COM4`)
    pub port: String,
    /// Upper bound on any blocking request/response exchange
    pub timeout_ms: u64,
    /// Delay between a ranging request and the first read attempt
    pub settle_ms: u64,
    /// Delay after opening the port before the board accepts commands
    pub open_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            timeout_ms: 50,
            settle_ms: 30,
            open_delay_ms: 2000,
        }
    }
}

/// Which eye drives gaze classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeEye {
    Left,
    Right,
    /// Both eyes must agree, otherwise CENTER
    Both,
}

/// Eye closure and gaze classification tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VisionConfig {
    pub ear_threshold: f32,
    pub gaze_eye: GazeEye,
    pub gaze_left_fraction: f32,
    pub gaze_right_fraction: f32,
    pub work_width: u32,
    pub work_height: u32,
    /// Neighbourhood size of the adaptive threshold (odd, >= 3)
    pub adaptive_block_size: u32,
    /// Constant subtracted from the weighted local mean
    pub adaptive_offset: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            gaze_eye: GazeEye::Left,
            gaze_left_fraction: 0.3,
            gaze_right_fraction: 0.7,
            work_width: 200,
            work_height: 100,
            adaptive_block_size: 11,
            adaptive_offset: 2.0,
        }
    }
}

/// Motion state machine tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Continuous eye closure that toggles start/stop
    pub toggle_hold_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            toggle_hold_ms: 1500,
        }
    }
}

/// How a failed distance read is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFailurePolicy {
    /// Treat as a far reading (no obstacle)
    AssumeClear,
    /// Keep the last classified zone
    HoldLast,
}

/// Obstacle zone limits (sensor distance units, centimetres on the reference board)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Readings strictly below this are BLOCKED
    pub blocked_below: f32,
    /// Readings up to and including this are WARNING
    pub warning_up_to: f32,
    pub sensor_failure: SensorFailurePolicy,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            blocked_below: 20.0,
            warning_up_to: 50.0,
            sensor_failure: SensorFailurePolicy::AssumeClear,
        }
    }
}

/// Speech backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    /// Announcements are only logged
    Log,
    /// Announcements are rendered by an external program
    Command,
}

/// Spoken announcement configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechEngine,
    pub program: String,
    /// Arguments placed before the announcement text
    pub args: Vec<String>,
    pub queue_capacity: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngine::Log,
            program: "espeak".to_string(),
            args: Vec::new(),
            queue_capacity: 16,
        }
    }
}

/// Main loop pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlLoopConfig {
    pub fps: u32,
    /// Cycles between status log lines (0 = disabled)
    pub status_interval: u64,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            status_interval: 300,
        }
    }
}
