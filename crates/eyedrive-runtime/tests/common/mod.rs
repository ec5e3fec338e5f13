// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use eyedrive_core::{
    AnnouncementGate, ControlCore, DetectedFace, EyeContour, GazeBucket, Point, SpeechWorker,
};
use eyedrive_hal::{CommandSink, HalError, HalResult, SpeechSink};
use eyedrive_runtime::{
    ControlLoop, LoopSettings, ReplayExtractor, ReplayFrames, ReplayRanging, Session, SessionRecord,
};
use parking_lot::Mutex;

pub const FRAME_MS: u64 = 33;

/// Command sink whose byte log survives the control loop
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<u8>>>,
}

impl CommandSink for RecordingSink {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        self.sent.lock().push(command_byte);
        Ok(())
    }
}

/// Command sink that rejects every byte
#[derive(Clone, Default)]
pub struct BrokenSink {
    pub attempts: Arc<Mutex<Vec<u8>>>,
}

impl CommandSink for BrokenSink {
    fn send(&mut self, command_byte: u8) -> HalResult<()> {
        self.attempts.lock().push(command_byte);
        Err(HalError::Disconnected)
    }
}

#[derive(Clone, Default)]
pub struct RecordingSpeech {
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl SpeechSink for RecordingSpeech {
    fn speak(&mut self, text: &str) -> HalResult<()> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}

pub fn eye(open: f32) -> EyeContour {
    [
        Point::new(0.0, 0.0),
        Point::new(3.0, -open),
        Point::new(7.0, -open),
        Point::new(10.0, 0.0),
        Point::new(7.0, open),
        Point::new(3.0, open),
    ]
}

pub fn open_face(gaze: GazeBucket) -> DetectedFace {
    DetectedFace::new(eye(2.0), eye(2.0)).with_gaze_hint(gaze)
}

pub fn closed_face() -> DetectedFace {
    DetectedFace::new(eye(0.5), eye(0.5)).with_gaze_hint(GazeBucket::Center)
}

pub fn record(t_ms: u64, face: Option<DetectedFace>, distance: Option<f32>) -> SessionRecord {
    SessionRecord {
        t_ms: Some(t_ms),
        faces: face.into_iter().collect(),
        distance,
        ..SessionRecord::default()
    }
}

/// Eyes closed for 1.6 s, then open looking ahead
pub fn blink_start(distance: f32) -> Vec<SessionRecord> {
    let mut records = Vec::new();
    let mut t = 0;
    while t <= 1600 {
        records.push(record(t, Some(closed_face()), Some(distance)));
        t += FRAME_MS;
    }
    records.push(record(t, Some(open_face(GazeBucket::Center)), Some(distance)));
    records
}

pub type ReplayLoop<C> = ControlLoop<ReplayFrames, ReplayExtractor, C, ReplayRanging>;

pub fn replay_loop<C: CommandSink>(
    records: Vec<SessionRecord>,
    sink: C,
    speech: RecordingSpeech,
) -> ReplayLoop<C> {
    let (frames, extractor, ranging) =
        Session::from_records(records).into_replay(Duration::from_millis(FRAME_MS));
    let worker = SpeechWorker::spawn(AnnouncementGate::new(speech), 16).expect("spawn speech worker");
    ControlLoop::new(
        frames,
        extractor,
        sink,
        ranging,
        ControlCore::default(),
        worker,
        LoopSettings {
            pace: false,
            status_interval: 0,
            ..LoopSettings::default()
        },
    )
}
