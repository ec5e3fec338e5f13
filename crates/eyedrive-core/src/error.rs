// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the decision core

use eyedrive_hal::HalError;

/// Result type alias using CoreError
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Settings that would make the state machine meaningless
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Speech sink failed while rendering inside the gate
    #[error("Speech failed: {0}")]
    Speech(#[from] HalError),

    /// The gate was not released within the bounded wait
    #[error("Announcement gate still held after {waited_ms} ms")]
    GateBusy { waited_ms: u64 },

    /// The speech worker cannot take more announcements
    #[error("Speech queue unavailable: {0}")]
    SpeechBacklog(String),

    /// The speech worker thread could not be started
    #[error("Failed to spawn speech worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
