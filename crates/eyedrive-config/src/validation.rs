// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are within valid ranges and consistent with
//! each other before the control loop starts.

use crate::{ConfigError, ConfigResult, EyedriveConfig, SpeechEngine};

/// Serial exchanges must stay well inside one video frame.
const MAX_SERIAL_TIMEOUT_MS: u64 = 100;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    Inconsistent { first: String, second: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::Inconsistent {
                first,
                second,
                reason,
            } => {
                write!(f, "{} and {} are inconsistent: {}", first, second, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &EyedriveConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_vision(config, &mut errors);
    validate_obstacle(config, &mut errors);
    validate_timing(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &EyedriveConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.serial.port.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "serial.port".to_string(),
        });
    }

    if config.speech.engine == SpeechEngine::Command && config.speech.program.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "speech.program".to_string(),
        });
    }
}

fn validate_vision(config: &EyedriveConfig, errors: &mut Vec<ConfigValidationError>) {
    let vision = &config.vision;

    if !(vision.ear_threshold > 0.0 && vision.ear_threshold < 1.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "vision.ear_threshold".to_string(),
            reason: "must be between 0.0 and 1.0".to_string(),
        });
    }

    for (field, fraction) in [
        ("vision.gaze_left_fraction", vision.gaze_left_fraction),
        ("vision.gaze_right_fraction", vision.gaze_right_fraction),
    ] {
        if !(fraction > 0.0 && fraction < 1.0) {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
    }

    if vision.gaze_left_fraction >= vision.gaze_right_fraction {
        errors.push(ConfigValidationError::Inconsistent {
            first: "vision.gaze_left_fraction".to_string(),
            second: "vision.gaze_right_fraction".to_string(),
            reason: "left fraction must be below right fraction".to_string(),
        });
    }

    if vision.work_width == 0 || vision.work_height == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "vision.work_width/work_height".to_string(),
            reason: "must be non-zero".to_string(),
        });
    }

    if vision.adaptive_block_size < 3 || vision.adaptive_block_size % 2 == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "vision.adaptive_block_size".to_string(),
            reason: "must be odd and at least 3".to_string(),
        });
    }
}

fn validate_obstacle(config: &EyedriveConfig, errors: &mut Vec<ConfigValidationError>) {
    let obstacle = &config.obstacle;

    if obstacle.blocked_below <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "obstacle.blocked_below".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if obstacle.warning_up_to < obstacle.blocked_below {
        errors.push(ConfigValidationError::Inconsistent {
            first: "obstacle.blocked_below".to_string(),
            second: "obstacle.warning_up_to".to_string(),
            reason: "warning limit must not be below the blocked limit".to_string(),
        });
    }
}

fn validate_timing(config: &EyedriveConfig, errors: &mut Vec<ConfigValidationError>) {
    let timeout = config.serial.timeout_ms;
    if timeout == 0 || timeout >= MAX_SERIAL_TIMEOUT_MS {
        errors.push(ConfigValidationError::InvalidValue {
            field: "serial.timeout_ms".to_string(),
            reason: format!("must be between 1 and {} ms", MAX_SERIAL_TIMEOUT_MS - 1),
        });
    }

    if config.serial.settle_ms >= timeout {
        errors.push(ConfigValidationError::Inconsistent {
            first: "serial.settle_ms".to_string(),
            second: "serial.timeout_ms".to_string(),
            reason: "settle delay must be shorter than the timeout".to_string(),
        });
    }

    if config.motion.toggle_hold_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "motion.toggle_hold_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.control_loop.fps == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "control_loop.fps".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.speech.queue_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "speech.queue_capacity".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}
