// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for hardware access

/// Result type alias using HalError
pub type HalResult<T> = std::result::Result<T, HalError>;

/// Hardware access errors
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// Serial transport reported an error
    #[error("Serial error: {0}")]
    Serial(String),

    /// No complete response inside the bounded wait
    #[error("{operation} timed out after {waited_ms} ms")]
    Timeout {
        operation: &'static str,
        waited_ms: u64,
    },

    /// Response arrived but could not be interpreted
    #[error("Unparsable response: {0:?}")]
    Unparsable(String),

    /// Fewer bytes were accepted than requested
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The peer went away (reader thread ended, device unplugged)
    #[error("Device disconnected")]
    Disconnected,

    /// Speech engine failed to render
    #[error("Speech error: {0}")]
    Speech(String),
}

impl HalError {
    /// Whether the next cycle may reasonably succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HalError::Timeout { .. } | HalError::Unparsable(_) | HalError::ShortWrite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let timeout = HalError::Timeout {
            operation: "distance read",
            waited_ms: 50,
        };
        assert!(timeout.is_transient());
        assert!(HalError::Unparsable("ERR".to_string()).is_transient());
        assert!(!HalError::Disconnected.is_transient());
        assert!(!HalError::Serial("port closed".to_string()).is_transient());
    }
}
