// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

/// Serial I/O abstraction for the actuator board
pub trait SerialIO {
    /// Platform-specific error type
    type Error: std::fmt::Display;

    /// Write bytes to serial port
    ///
    /// # Returns
    /// Number of bytes written or error
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read bytes from serial port (non-blocking)
    ///
    /// # Returns
    /// Number of bytes read (0 if nothing is pending) or error
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error>;

    /// Flush output buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Whether `error` means the port gave up waiting rather than failed
    fn is_timeout(_error: &Self::Error) -> bool {
        false
    }
}
