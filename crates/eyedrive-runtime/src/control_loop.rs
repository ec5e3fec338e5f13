// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! The cooperative control loop
//!
//! Each cycle runs capture, extraction, ranging, [`ControlCore::step`], command
//! transmission and announcement dispatch in that order. Speech never blocks
//! the cycle; it is queued on the [`SpeechWorker`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use eyedrive_config::EyedriveConfig;
use eyedrive_core::{Command, ControlCore, CycleOutput, EyeSignal, SignalExtractor, SpeechWorker};
use eyedrive_hal::{CommandSink, RangeSensor};
use tracing::{debug, error, info, warn};

use crate::sources::FrameSource;
use crate::RuntimeResult;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub fps: u32,
    /// Cycles between status log lines (0 disables them)
    pub status_interval: u64,
    /// Sleep to hold the frame rate; replays can run flat out
    pub pace: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            status_interval: 300,
            pace: true,
        }
    }
}

impl From<&EyedriveConfig> for LoopSettings {
    fn from(config: &EyedriveConfig) -> Self {
        Self {
            fps: config.control_loop.fps,
            status_interval: config.control_loop.status_interval,
            pace: true,
        }
    }
}

impl LoopSettings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
    pub range_failures: u64,
    /// Send or range errors that are not expected to clear on the next cycle
    pub link_faults: u64,
    pub faces_missing: u64,
    pub announcements_queued: u64,
    pub announcements_dropped: u64,
    pub deadline_misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The running flag was cleared (Ctrl-C)
    Interrupted,
    /// The frame source ended
    CaptureEnded,
}

pub struct ControlLoop<F, X, C, R>
where
    F: FrameSource,
    X: SignalExtractor,
    C: CommandSink,
    R: RangeSensor,
{
    source: F,
    extractor: X,
    sink: C,
    ranging: R,
    core: ControlCore,
    speech: SpeechWorker,
    settings: LoopSettings,
    stats: LoopStats,
    running: Arc<AtomicBool>,
    started: Instant,
    stopped: bool,
}

impl<F, X, C, R> ControlLoop<F, X, C, R>
where
    F: FrameSource,
    X: SignalExtractor,
    C: CommandSink,
    R: RangeSensor,
{
    pub fn new(
        source: F,
        extractor: X,
        sink: C,
        ranging: R,
        core: ControlCore,
        speech: SpeechWorker,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            extractor,
            sink,
            ranging,
            core,
            speech,
            settings,
            stats: LoopStats::default(),
            running: Arc::new(AtomicBool::new(true)),
            started: Instant::now(),
            stopped: false,
        }
    }

    /// Flag checked before every cycle; clear it to stop the loop
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn core(&self) -> &ControlCore {
        &self.core
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }

    pub fn speech(&self) -> &SpeechWorker {
        &self.speech
    }

    /// Run one cycle. `Ok(None)` when the frame source has ended.
    pub fn run_cycle(&mut self) -> RuntimeResult<Option<CycleOutput>> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        let now = frame
            .offset
            .map(|offset| self.started + offset)
            .unwrap_or_else(Instant::now);

        let faces = self.extractor.detect(&frame.image);
        let distance = match self.ranging.read_distance() {
            Ok(distance) => Some(distance),
            Err(e) => {
                self.stats.range_failures += 1;
                if e.is_transient() {
                    debug!(target: "eyedrive_runtime", "No distance reading: {}", e);
                } else {
                    self.stats.link_faults += 1;
                    warn!(target: "eyedrive_runtime", "Ranging link fault: {}", e);
                }
                None
            }
        };

        let output = self.core.step(&frame.image, &faces, distance, now);
        self.stats.cycles += 1;
        if faces.is_empty() {
            self.stats.faces_missing += 1;
        }

        if let Some(command) = output.command {
            self.transmit(command);
        }

        for request in &output.announcements {
            match self.speech.dispatch(request.clone()) {
                Ok(()) => self.stats.announcements_queued += 1,
                Err(e) => warn!(target: "eyedrive_runtime", "Announcement dropped: {}", e),
            }
        }
        // refused requests plus stale ones evicted from a full queue
        self.stats.announcements_dropped = self.speech.dropped();

        self.log_cycle(&output, distance);
        Ok(Some(output))
    }

    /// Run until interrupted or the frame source ends
    ///
    /// A capture error shuts the loop down and is returned.
    pub fn run(&mut self) -> RuntimeResult<StopReason> {
        let interval = self.settings.cycle_interval();
        info!(
            target: "eyedrive_runtime",
            "🔄 Control loop running at {} fps (Press Ctrl+C to stop)...",
            self.settings.fps
        );

        let reason = loop {
            if !self.running.load(Ordering::Relaxed) {
                info!(target: "eyedrive_runtime", "Shutdown requested");
                break StopReason::Interrupted;
            }

            let cycle_start = Instant::now();
            match self.run_cycle() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!(target: "eyedrive_runtime", "Frame source ended");
                    break StopReason::CaptureEnded;
                }
                Err(e) => {
                    error!(target: "eyedrive_runtime", "Capture failed: {}", e);
                    self.shutdown();
                    return Err(e);
                }
            }

            if self.settings.status_interval > 0
                && self.stats.cycles % self.settings.status_interval == 0
            {
                self.log_status();
            }

            if self.settings.pace {
                let elapsed = cycle_start.elapsed();
                if elapsed < interval {
                    std::thread::sleep(interval - elapsed);
                } else {
                    self.stats.deadline_misses += 1;
                    debug!(
                        target: "eyedrive_runtime",
                        "Cycle {} overran its {:?} interval ({:?})",
                        self.stats.cycles, interval, elapsed
                    );
                }
            }
        };

        self.shutdown();
        Ok(reason)
    }

    /// Stop the chair if it is moving and drain pending speech
    ///
    /// Runs once; later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if self.core.motion_state().moving {
            warn!(target: "eyedrive_runtime", "Chair still moving at shutdown, sending STOP");
            self.transmit(Command::Stop);
        }
        self.speech.shutdown();
        self.log_status();
        info!(target: "eyedrive_runtime", "Stopped after {} cycles", self.stats.cycles);
    }

    fn transmit(&mut self, command: Command) {
        match self.sink.send(command.wire_byte()) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                info!(target: "eyedrive_runtime", "➡️  Sent {}", command);
            }
            Err(e) => {
                self.stats.send_failures += 1;
                if !e.is_transient() {
                    self.stats.link_faults += 1;
                }
                warn!(target: "eyedrive_runtime", "Failed to send {}: {}", command, e);
            }
        }
    }

    fn log_cycle(&self, output: &CycleOutput, distance: Option<f32>) {
        let (eyes, gaze) = match output.eyes {
            EyeSignal::Present { closure, gaze } => (
                if closure.is_closed { "Eyes Closed" } else { "Eyes Open" },
                gaze.to_string(),
            ),
            EyeSignal::Absent => ("No face", "-".to_string()),
        };
        debug!(
            target: "eyedrive_runtime",
            "cycle={} gaze={} eyes={} zone={} distance={:?} moving={}",
            self.stats.cycles,
            gaze,
            eyes,
            output.zone.zone,
            distance,
            self.core.motion_state().moving
        );
    }

    fn log_status(&self) {
        info!(
            target: "eyedrive_runtime",
            "Status: {} cycles, {} commands ({} failed), {} range failures, {} link faults, {} deadline misses, {} announcements ({} dropped)",
            self.stats.cycles,
            self.stats.commands_sent,
            self.stats.send_failures,
            self.stats.range_failures,
            self.stats.link_faults,
            self.stats.deadline_misses,
            self.stats.announcements_queued,
            self.stats.announcements_dropped
        );
    }
}

impl<F, X, C, R> Drop for ControlLoop<F, X, C, R>
where
    F: FrameSource,
    X: SignalExtractor,
    C: CommandSink,
    R: RangeSensor,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
