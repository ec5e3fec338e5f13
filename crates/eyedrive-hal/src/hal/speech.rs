// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::HalResult;

/// Text-to-speech output
///
/// `speak` blocks until the phrase has been fully rendered. Callers that must
/// not block (the control loop) go through the announcement gate's worker.
pub trait SpeechSink {
    fn speak(&mut self, text: &str) -> HalResult<()>;
}

impl<T: SpeechSink + ?Sized> SpeechSink for Box<T> {
    fn speak(&mut self, text: &str) -> HalResult<()> {
        (**self).speak(text)
    }
}
