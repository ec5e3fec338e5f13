// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::HalResult;

/// Transmits single-byte motion commands to the actuator firmware
pub trait CommandSink {
    /// Send one command byte; `Ok` means the transport accepted it
    fn send(&mut self, command_byte: u8) -> HalResult<()>;
}

/// Pollable obstacle ranging with a bounded wait
pub trait RangeSensor {
    /// Request and read one distance sample
    ///
    /// Implementations must return within their configured timeout; a
    /// missing or malformed reply is an error, never an indefinite block.
    fn read_distance(&mut self) -> HalResult<f32>;
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        (**self).send(command_byte)
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read_distance(&mut self) -> HalResult<f32> {
        (**self).read_distance()
    }
}
