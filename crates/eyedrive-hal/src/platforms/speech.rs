// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Speech backends

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::hal::SpeechSink;
use crate::{HalError, HalResult};

/// Speech sink that only logs the phrase (headless runs, dry runs)
#[derive(Debug, Default)]
pub struct LogSpeech {
    spoken: u64,
}

impl LogSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> u64 {
        self.spoken
    }
}

impl SpeechSink for LogSpeech {
    fn speak(&mut self, text: &str) -> HalResult<()> {
        self.spoken += 1;
        info!(target: "eyedrive_hal", "🔊 {}", text);
        Ok(())
    }
}

/// Renders each phrase with an external TTS program, e.g. `espeak "<text>"`
///
/// The program is run to completion for every phrase, so `speak` blocks for
/// the duration of the audio.
#[derive(Debug, Clone)]
pub struct ProcessSpeech {
    program: String,
    args: Vec<String>,
}

impl ProcessSpeech {
    /// `args` are placed before the phrase on the command line
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechSink for ProcessSpeech {
    fn speak(&mut self, text: &str) -> HalResult<()> {
        debug!(target: "eyedrive_hal", "Rendering {:?} with {}", text, self.program);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|e| HalError::Speech(format!("failed to run {}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(HalError::Speech(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}
