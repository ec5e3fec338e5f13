// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Eye closure tracking from landmark geometry
//!
//! The eye aspect ratio (EAR) of each eye is
//!
//! ```text
//!        ‖p2 − p6‖ + ‖p3 − p5‖
//! EAR = ───────────────────────
//!            2 · ‖p1 − p4‖
//! ```
//!
//! and the two eyes are averaged. An averaged EAR below the threshold counts as
//! closed. The estimator keeps a single [`ClosureState`] so the motion
//! controller can ask how long the eyes have been shut.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::signals::{DetectedFace, EyeContour};

pub const DEFAULT_EAR_THRESHOLD: f32 = 0.25;

/// EAR of one eye. A contour with no horizontal span reads as fully closed.
pub fn eye_aspect_ratio(eye: &EyeContour) -> f32 {
    let vertical = eye[1].distance(&eye[5]) + eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal <= f32::EPSILON {
        return 0.0;
    }
    vertical / (2.0 * horizontal)
}

/// Mean EAR of both eyes
pub fn face_aspect_ratio(face: &DetectedFace) -> f32 {
    (eye_aspect_ratio(&face.left_eye) + eye_aspect_ratio(&face.right_eye)) / 2.0
}

/// Persistent closure state
///
/// `closed_since` is `None` while the eyes are open, and also once the closure
/// in progress has been consumed as a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClosureState {
    pub is_closed: bool,
    pub closed_since: Option<Instant>,
}

/// Per-cycle result of [`EyeStateEstimator::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosureReading {
    pub ear: f32,
    pub is_closed: bool,
    /// Time since the current closure began. Zero while open or after the
    /// closure has been acknowledged as a gesture.
    pub elapsed_closed: Duration,
    /// Set only on the cycle the eyes reopen after a closure that was never
    /// acknowledged: how long that closure lasted.
    pub reopened_after: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct EyeStateEstimator {
    threshold: f32,
    state: ClosureState,
}

impl Default for EyeStateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_EAR_THRESHOLD)
    }
}

impl EyeStateEstimator {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: ClosureState::default(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn state(&self) -> &ClosureState {
        &self.state
    }

    /// Fold one face observation into the closure state
    pub fn update(&mut self, face: &DetectedFace, now: Instant) -> ClosureReading {
        let ear = face_aspect_ratio(face);
        let closed = ear < self.threshold;
        let mut reopened_after = None;

        match (self.state.is_closed, closed) {
            (false, true) => {
                trace!(target: "eyedrive_core", "Eyes closed (EAR {:.3})", ear);
                self.state.closed_since = Some(now);
            }
            (true, false) => {
                reopened_after = self
                    .state
                    .closed_since
                    .take()
                    .map(|since| now.saturating_duration_since(since));
                trace!(target: "eyedrive_core", "Eyes reopened after {:?}", reopened_after);
            }
            _ => {}
        }
        self.state.is_closed = closed;

        let elapsed_closed = match (closed, self.state.closed_since) {
            (true, Some(since)) => now.saturating_duration_since(since),
            _ => Duration::ZERO,
        };

        ClosureReading {
            ear,
            is_closed: closed,
            elapsed_closed,
            reopened_after,
        }
    }

    /// Consume the closure in progress so it cannot trigger again until the
    /// eyes reopen and close anew
    pub fn acknowledge_gesture(&mut self) {
        if self.state.is_closed {
            self.state.closed_since = None;
        }
    }
}
