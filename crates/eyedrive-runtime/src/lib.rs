// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! EyeDrive runtime
//!
//! Wires the decision core to frame sources, the motor/ranging board and the
//! speech worker, and drives it at a fixed frame rate.

pub mod control_loop;
pub mod error;
pub mod session;
pub mod sources;

pub use control_loop::{ControlLoop, LoopSettings, LoopStats, StopReason};
pub use error::{RuntimeError, RuntimeResult};
pub use session::{ReplayExtractor, ReplayFrames, ReplayRanging, Session, SessionRecord};
pub use sources::{CapturedFrame, FrameSource};
