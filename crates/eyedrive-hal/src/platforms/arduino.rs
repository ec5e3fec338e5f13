// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Arduino motor/ranging board protocol
//!
//! The board firmware understands one byte per request:
//! - `F`, `S`, `L`, `R` - motion commands, no reply
//! - `G` - ranging request, answered with an ASCII decimal line (`"42.5\r\n"`)

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::hal::{CommandSink, RangeSensor, SerialIO};
use crate::{HalError, HalResult};

/// Ranging request byte
pub const REQUEST_DISTANCE: u8 = b'G';

/// Replies longer than this are garbage, not a distance
const MAX_LINE_LEN: usize = 32;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Bounded-wait parameters of the link
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Total wait for a request/response exchange
    pub timeout: Duration,
    /// Delay after a ranging request before polling for the reply
    pub settle: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(50),
            settle: Duration::from_millis(30),
        }
    }
}

/// Command and ranging client for the Arduino board
pub struct ArduinoLink<S: SerialIO> {
    serial: S,
    timing: LinkTiming,
    line: Vec<u8>,
}

impl<S: SerialIO> ArduinoLink<S> {
    pub fn new(serial: S, timing: LinkTiming) -> Self {
        Self {
            serial,
            timing,
            line: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    pub fn timing(&self) -> LinkTiming {
        self.timing
    }

    /// Release the underlying serial port
    pub fn into_inner(self) -> S {
        self.serial
    }

    /// Share one link between a command handle and a ranging handle
    pub fn into_shared(self) -> SharedLink<S> {
        SharedLink {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    /// Write and flush; the exchange fails if it ran past the timeout
    fn write_all(&mut self, data: &[u8], operation: &'static str) -> HalResult<()> {
        let started = Instant::now();
        let written = self
            .serial
            .write(data)
            .map_err(|e| Self::write_error(e, operation, started))?;
        if written != data.len() {
            return Err(HalError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        self.serial
            .flush()
            .map_err(|e| Self::write_error(e, operation, started))?;

        let waited = started.elapsed();
        if waited > self.timing.timeout {
            return Err(HalError::Timeout {
                operation,
                waited_ms: waited.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn write_error(error: S::Error, operation: &'static str, started: Instant) -> HalError {
        if S::is_timeout(&error) {
            HalError::Timeout {
                operation,
                waited_ms: started.elapsed().as_millis() as u64,
            }
        } else {
            HalError::Serial(error.to_string())
        }
    }

    /// Drop replies left over from an earlier, timed-out request
    fn discard_pending(&mut self) -> HalResult<()> {
        self.line.clear();
        let mut scratch = [0u8; 64];
        // Bounded so a chattering board cannot stall the cycle
        for _ in 0..16 {
            let n = self
                .serial
                .read(&mut scratch)
                .map_err(|e| HalError::Serial(e.to_string()))?;
            if n == 0 {
                break;
            }
            trace!(target: "eyedrive_hal", "Discarded {} stale bytes", n);
        }
        Ok(())
    }

    fn read_line(&mut self, started: Instant) -> HalResult<String> {
        let mut buf = [0u8; MAX_LINE_LEN];
        loop {
            let n = self
                .serial
                .read(&mut buf)
                .map_err(|e| HalError::Serial(e.to_string()))?;
            self.line.extend_from_slice(&buf[..n]);

            if let Some(pos) = self.line.iter().position(|&b| b == b'\n') {
                let rest = self.line.split_off(pos + 1);
                let line = std::mem::replace(&mut self.line, rest);
                return Ok(String::from_utf8_lossy(&line).trim().to_string());
            }

            if self.line.len() > MAX_LINE_LEN {
                let garbage = String::from_utf8_lossy(&self.line).to_string();
                self.line.clear();
                return Err(HalError::Unparsable(garbage));
            }

            if started.elapsed() >= self.timing.timeout {
                return Err(HalError::Timeout {
                    operation: "distance read",
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }

            if n == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Parse one reply line into a distance
pub fn parse_distance(line: &str) -> HalResult<f32> {
    match line.trim().parse::<f32>() {
        Ok(distance) if distance.is_finite() && distance >= 0.0 => Ok(distance),
        _ => Err(HalError::Unparsable(line.to_string())),
    }
}

impl<S: SerialIO> CommandSink for ArduinoLink<S> {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        debug!(target: "eyedrive_hal", "-> {:?}", command_byte as char);
        self.write_all(&[command_byte], "command write")
    }
}

impl<S: SerialIO> RangeSensor for ArduinoLink<S> {
    fn read_distance(&mut self) -> HalResult<f32> {
        self.discard_pending()?;
        let started = Instant::now();
        self.write_all(&[REQUEST_DISTANCE], "distance request")?;

        let settle = self.timing.settle.min(self.timing.timeout);
        if !settle.is_zero() {
            thread::sleep(settle);
        }

        let line = self.read_line(started)?;
        let distance = parse_distance(&line)?;
        trace!(target: "eyedrive_hal", "<- distance {}", distance);
        Ok(distance)
    }
}

/// Clonable handle to one [`ArduinoLink`]; every clone serializes on the same port.
pub struct SharedLink<S: SerialIO> {
    inner: Arc<Mutex<ArduinoLink<S>>>,
}

impl<S: SerialIO> Clone for SharedLink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SerialIO> CommandSink for SharedLink<S> {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        self.inner.lock().send(command_byte)
    }
}

impl<S: SerialIO> RangeSensor for SharedLink<S> {
    fn read_distance(&mut self) -> HalResult<f32> {
        self.inner.lock().read_distance()
    }
}
