// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EyeDrive Configuration System
//!
//! Type-safe configuration loader for EyeDrive with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eyedrive_config::{load_config, EyedriveConfig};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("Serial port: {}", config.serial.port);
//! println!("EAR threshold: {}", config.vision.ear_threshold);
//! ```
//!
//! Every tunable of the control core (EAR threshold, toggle hold time, obstacle
//! zone limits, gaze fractions) lives in `eyedrive.toml`; the defaults below
//! match the stock Arduino chair setup.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    load_config_or_default,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
