// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{
    ConfigError, ConfigResult, EyedriveConfig, GazeEye, SensorFailurePolicy, SpeechEngine,
};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "eyedrive.toml";

/// Find the EyeDrive configuration file
///
/// Search order:
/// 1. `EYEDRIVE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./eyedrive.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("EYEDRIVE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by EYEDRIVE_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "EyeDrive configuration file '{}' not found in any of these locations:\n{}\n\nSet EYEDRIVE_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<EyedriveConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: EyedriveConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`], but falls back to built-in defaults when no file is found.
///
/// An explicitly given path that does not exist is still an error.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<EyedriveConfig> {
    match load_config(config_path, cli_args) {
        Err(ConfigError::FileNotFound(_)) if config_path.is_none() => {
            let mut config = EyedriveConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        other => other,
    }
}

fn parse_bool(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}

fn parse_gaze_eye(value: &str) -> Option<GazeEye> {
    match value.to_lowercase().as_str() {
        "left" => Some(GazeEye::Left),
        "right" => Some(GazeEye::Right),
        "both" => Some(GazeEye::Both),
        _ => None,
    }
}

fn parse_failure_policy(value: &str) -> Option<SensorFailurePolicy> {
    match value.to_lowercase().as_str() {
        "assume_clear" => Some(SensorFailurePolicy::AssumeClear),
        "hold_last" => Some(SensorFailurePolicy::HoldLast),
        _ => None,
    }
}

fn parse_speech_engine(value: &str) -> Option<SpeechEngine> {
    match value.to_lowercase().as_str() {
        "log" => Some(SpeechEngine::Log),
        "command" => Some(SpeechEngine::Command),
        _ => None,
    }
}

/// Apply a single `key = value` override. Shared by the env and CLI tiers.
///
/// Unknown keys and unparsable values are ignored, matching the file tier where
/// missing fields keep their defaults.
fn apply_override(config: &mut EyedriveConfig, key: &str, value: &str) {
    match key {
        "debug" => config.system.debug = parse_bool(value),
        "log_level" => config.system.log_level = value.to_string(),

        "serial_port" => config.serial.port = value.to_string(),
        "serial_timeout_ms" => {
            if let Ok(ms) = value.parse::<u64>() {
                config.serial.timeout_ms = ms;
            }
        }
        "serial_settle_ms" => {
            if let Ok(ms) = value.parse::<u64>() {
                config.serial.settle_ms = ms;
            }
        }
        "serial_open_delay_ms" => {
            if let Ok(ms) = value.parse::<u64>() {
                config.serial.open_delay_ms = ms;
            }
        }

        "ear_threshold" => {
            if let Ok(threshold) = value.parse::<f32>() {
                config.vision.ear_threshold = threshold;
            }
        }
        "gaze_eye" => {
            if let Some(eye) = parse_gaze_eye(value) {
                config.vision.gaze_eye = eye;
            }
        }

        "toggle_hold_ms" => {
            if let Ok(ms) = value.parse::<u64>() {
                config.motion.toggle_hold_ms = ms;
            }
        }

        "blocked_below" => {
            if let Ok(distance) = value.parse::<f32>() {
                config.obstacle.blocked_below = distance;
            }
        }
        "warning_up_to" => {
            if let Ok(distance) = value.parse::<f32>() {
                config.obstacle.warning_up_to = distance;
            }
        }
        "sensor_failure" => {
            if let Some(policy) = parse_failure_policy(value) {
                config.obstacle.sensor_failure = policy;
            }
        }

        "speech_engine" => {
            if let Some(engine) = parse_speech_engine(value) {
                config.speech.engine = engine;
            }
        }
        "speech_program" => config.speech.program = value.to_string(),

        "fps" => {
            if let Ok(fps) = value.parse::<u32>() {
                config.control_loop.fps = fps;
            }
        }
        _ => {}
    }
}

/// Environment variable to override key mapping
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("EYEDRIVE_DEBUG_MODE", "debug"),
    ("EYEDRIVE_LOG_LEVEL", "log_level"),
    ("EYEDRIVE_SERIAL_PORT", "serial_port"),
    ("EYEDRIVE_SERIAL_TIMEOUT_MS", "serial_timeout_ms"),
    ("EYEDRIVE_SERIAL_SETTLE_MS", "serial_settle_ms"),
    ("EYEDRIVE_SERIAL_OPEN_DELAY_MS", "serial_open_delay_ms"),
    ("EYEDRIVE_EAR_THRESHOLD", "ear_threshold"),
    ("EYEDRIVE_GAZE_EYE", "gaze_eye"),
    ("EYEDRIVE_TOGGLE_HOLD_MS", "toggle_hold_ms"),
    ("EYEDRIVE_BLOCKED_BELOW", "blocked_below"),
    ("EYEDRIVE_WARNING_UP_TO", "warning_up_to"),
    ("EYEDRIVE_SENSOR_FAILURE", "sensor_failure"),
    ("EYEDRIVE_SPEECH_ENGINE", "speech_engine"),
    ("EYEDRIVE_SPEECH_PROGRAM", "speech_program"),
    ("EYEDRIVE_FPS", "fps"),
];

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `EYEDRIVE_SERIAL_PORT` -> `serial.port`
/// - `EYEDRIVE_SERIAL_TIMEOUT_MS` -> `serial.timeout_ms`
/// - `EYEDRIVE_EAR_THRESHOLD` -> `vision.ear_threshold`
/// - `EYEDRIVE_TOGGLE_HOLD_MS` -> `motion.toggle_hold_ms`
/// - `EYEDRIVE_SENSOR_FAILURE` -> `obstacle.sensor_failure`
/// - `EYEDRIVE_FPS` -> `control_loop.fps`
/// - ... see `ENV_OVERRIDES` for the full table
pub fn apply_environment_overrides(config: &mut EyedriveConfig) {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            apply_override(config, key, &value);
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"serial_port": "/dev/ttyUSB0", "fps": "15"}`)
pub fn apply_cli_overrides(config: &mut EyedriveConfig, cli_args: &HashMap<String, String>) {
    for (key, value) in cli_args {
        apply_override(config, key, value);
    }
}
