// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime errors

use std::path::PathBuf;

use eyedrive_config::ConfigError;
use eyedrive_core::CoreError;
use eyedrive_hal::HalError;

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Failed to read session {path}: {source}")]
    SessionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session line {line}: {message}")]
    SessionFormat { line: usize, message: String },

    #[error("Failed to load frame image {path}: {message}")]
    FrameImage { path: PathBuf, message: String },

    /// No frame could be captured; fatal to the control loop
    #[error("Capture failed: {0}")]
    Capture(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
