// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

/// Actuator command and ranging traits.
pub mod actuator;
/// Serial input/output traits for UART-style communication.
pub mod serial;
/// Spoken announcement output.
pub mod speech;

pub use actuator::{CommandSink, RangeSensor};
pub use serial::SerialIO;
pub use speech::SpeechSink;
