// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

use tracing::info;

use crate::hal::CommandSink;
use crate::HalResult;

/// Command sink for dry runs: logs every byte instead of moving the chair
#[derive(Debug, Default)]
pub struct LogCommandSink {
    sent: Vec<u8>,
}

impl LogCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every byte accepted so far, in order
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
}

impl CommandSink for LogCommandSink {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        info!(target: "eyedrive_hal", "[dry-run] command {:?}", command_byte as char);
        self.sent.push(command_byte);
        Ok(())
    }
}
