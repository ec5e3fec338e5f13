// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EyeDrive Hardware Abstraction Layer
//!
//! Platform-agnostic traits for everything the wheelchair controller touches
//! outside of the process, plus the host implementations used on a laptop
//! driving an Arduino-class motor/ranging board.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ eyedrive-core / runtime      │
//! └──────────────┬───────────────┘
//!                │ CommandSink / RangeSensor / SpeechSink
//! ┌──────────────▼───────────────┐
//! │ ArduinoLink<S: SerialIO>     │  F/S/L/R command bytes, G ranging request
//! └──────────────┬───────────────┘
//!                │ SerialIO
//! ┌──────────────▼───────────────┐
//! │ DeviceSerial (tty node)      │
//! └──────────────────────────────┘
//! ```

pub mod error;
pub mod hal;
pub mod platforms;

pub use error::{HalError, HalResult};
pub use hal::{CommandSink, RangeSensor, SerialIO, SpeechSink};
pub use platforms::{
    ArduinoLink, DeviceSerial, LinkTiming, LogCommandSink, LogSpeech, ProcessSpeech, SharedLink,
};
