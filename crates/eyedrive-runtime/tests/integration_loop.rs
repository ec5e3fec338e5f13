// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the replayed control loop

mod common;

use std::io::Write;
use std::sync::atomic::Ordering;

use common::*;
use eyedrive_core::GazeBucket;
use eyedrive_runtime::{RuntimeError, Session, SessionRecord, StopReason};

#[test]
fn test_blink_steer_and_obstacle_stop() {
    let mut records = blink_start(120.0);
    let mut t = records.last().map(|r| r.t_ms.unwrap_or(0)).unwrap_or(0);
    for (gaze, distance) in [
        (GazeBucket::Left, 120.0),
        (GazeBucket::Left, 120.0),
        (GazeBucket::Center, 45.0),
        (GazeBucket::Center, 15.0),
        (GazeBucket::Center, 15.0),
    ] {
        t += FRAME_MS;
        records.push(record(t, Some(open_face(gaze)), Some(distance)));
    }

    let sink = RecordingSink::default();
    let speech = RecordingSpeech::default();
    let mut control = replay_loop(records, sink.clone(), speech.clone());

    assert_eq!(control.run().unwrap(), StopReason::CaptureEnded);
    assert_eq!(*sink.sent.lock(), b"FLFS".to_vec());
    assert_eq!(
        *speech.spoken.lock(),
        vec![
            "Starting the wheelchair",
            "Turning Left",
            "Obstacle ahead.",
            "Moving Forward",
            "Stopping the wheelchair.",
        ]
    );
    assert_eq!(control.stats().commands_sent, 4);
    assert!(!control.core().motion_state().moving);
}

#[test]
fn test_transmission_failure_does_not_roll_back() {
    let sink = BrokenSink::default();
    let mut control = replay_loop(blink_start(120.0), sink.clone(), RecordingSpeech::default());

    // stop before the end so shutdown does not add its own STOP attempt
    for _ in 0..50 {
        control.run_cycle().unwrap();
    }
    assert_eq!(*sink.attempts.lock(), b"F".to_vec());
    assert_eq!(control.stats().send_failures, 1);
    // a disconnected board will not come back by itself
    assert_eq!(control.stats().link_faults, 1);
    assert!(control.core().motion_state().moving);
}

#[test]
fn test_capture_error_is_fatal_and_stops_the_chair() {
    let mut records = blink_start(120.0);
    records.push(SessionRecord {
        capture_error: Some("camera unplugged".to_string()),
        ..SessionRecord::default()
    });

    let sink = RecordingSink::default();
    let speech = RecordingSpeech::default();
    let mut control = replay_loop(records, sink.clone(), speech.clone());

    let result = control.run();
    assert!(matches!(result, Err(RuntimeError::Capture(_))));
    // F from the blink, S from shutdown
    assert_eq!(*sink.sent.lock(), b"FS".to_vec());
    // speech drained before run returned
    assert_eq!(*speech.spoken.lock(), vec!["Starting the wheelchair"]);
}

#[test]
fn test_interrupt_before_first_cycle() {
    let mut control = replay_loop(
        blink_start(120.0),
        RecordingSink::default(),
        RecordingSpeech::default(),
    );
    control.running_flag().store(false, Ordering::SeqCst);

    assert_eq!(control.run().unwrap(), StopReason::Interrupted);
    assert_eq!(control.stats().cycles, 0);
}

#[test]
fn test_failed_ranging_counts_and_assumes_clear() {
    let records = vec![
        record(0, Some(open_face(GazeBucket::Center)), Some(10.0)),
        record(33, Some(open_face(GazeBucket::Center)), None),
        record(66, None, None),
    ];
    let mut control = replay_loop(records, RecordingSink::default(), RecordingSpeech::default());

    control.run().unwrap();
    assert_eq!(control.stats().range_failures, 2);
    assert_eq!(control.stats().link_faults, 0);
    assert_eq!(control.stats().faces_missing, 1);
    assert_eq!(control.core().zone(), eyedrive_core::ProximityZone::Clear);
}

#[test]
fn test_session_file_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "# recorded at the bench").unwrap();
    for record in blink_start(120.0) {
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }
    drop(file);

    let session = Session::load(&path).unwrap();
    assert_eq!(session.len(), blink_start(120.0).len());

    let sink = RecordingSink::default();
    let mut control = replay_loop(session.records().to_vec(), sink.clone(), RecordingSpeech::default());
    control.run().unwrap();
    // F from the blink, S from shutdown while moving
    assert_eq!(*sink.sent.lock(), b"FS".to_vec());
}

#[test]
fn test_missing_session_file() {
    let result = Session::load("/nonexistent/session.jsonl");
    assert!(matches!(result, Err(RuntimeError::SessionIo { .. })));
}
