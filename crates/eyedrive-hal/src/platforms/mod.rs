// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

/// Arduino board protocol over any [`SerialIO`](crate::hal::SerialIO).
pub mod arduino;
/// OS device-node serial port.
pub mod device_serial;
/// Logging command sink for dry runs.
pub mod log_sink;
/// Speech backends.
pub mod speech;

pub use arduino::{parse_distance, ArduinoLink, LinkTiming, SharedLink, REQUEST_DISTANCE};
pub use device_serial::DeviceSerial;
pub use log_sink::LogCommandSink;
pub use speech::{LogSpeech, ProcessSpeech};
