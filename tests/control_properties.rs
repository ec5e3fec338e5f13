// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the motion state machine driven through `ControlCore::step`

use std::time::{Duration, Instant};

use eyedrive::control::Trigger;
use eyedrive::prelude::*;
use image::GrayImage;
use proptest::prelude::*;

const FRAME_MS: u64 = 33;
const FAR: Option<f32> = Some(150.0);

#[derive(Debug, Clone, Copy)]
enum Eyes {
    Open(GazeBucket),
    Closed,
    Absent,
}

fn eye(open: f32) -> [Point; 6] {
    [
        Point::new(0.0, 0.0),
        Point::new(3.0, -open),
        Point::new(7.0, -open),
        Point::new(10.0, 0.0),
        Point::new(7.0, open),
        Point::new(3.0, open),
    ]
}

fn faces(eyes: Eyes) -> Vec<DetectedFace> {
    match eyes {
        Eyes::Open(gaze) => vec![DetectedFace::new(eye(2.0), eye(2.0)).with_gaze_hint(gaze)],
        Eyes::Closed => {
            vec![DetectedFace::new(eye(0.5), eye(0.5)).with_gaze_hint(GazeBucket::Center)]
        }
        Eyes::Absent => Vec::new(),
    }
}

fn gaze_strategy() -> impl Strategy<Value = GazeBucket> {
    prop_oneof![
        Just(GazeBucket::Left),
        Just(GazeBucket::Center),
        Just(GazeBucket::Right),
    ]
}

fn eyes_strategy() -> impl Strategy<Value = Eyes> {
    prop_oneof![
        gaze_strategy().prop_map(Eyes::Open),
        Just(Eyes::Closed),
        Just(Eyes::Absent),
    ]
}

/// Chair moving forward at `t0 + 1700ms`, eyes open
fn moving_core(frame: &GrayImage, t0: Instant) -> ControlCore {
    let mut core = ControlCore::default();
    core.step(frame, &faces(Eyes::Closed), FAR, t0);
    let output = core.step(frame, &faces(Eyes::Closed), FAR, t0 + Duration::from_millis(1600));
    assert_eq!(output.command, Some(Command::Forward));
    core.step(frame, &faces(Eyes::Open(GazeBucket::Center)), FAR, t0 + Duration::from_millis(1700));
    core
}

proptest! {
    #[test]
    fn blink_toggles_once_per_long_closure(segments in prop::collection::vec(1u64..90, 1..12)) {
        let frame = GrayImage::new(8, 8);
        let mut core = ControlCore::default();
        let t0 = Instant::now();
        let mut t = 0u64;
        let mut expected = 0;
        let mut toggles = 0;

        // segments alternate open, closed, open, ...
        for (index, samples) in segments.iter().enumerate() {
            let closed = index % 2 == 1;
            if closed && (samples - 1) * FRAME_MS >= 1500 {
                expected += 1;
            }
            let eyes = if closed { Eyes::Closed } else { Eyes::Open(GazeBucket::Center) };
            for _ in 0..*samples {
                let output = core.step(&frame, &faces(eyes), FAR, t0 + Duration::from_millis(t));
                if matches!(output.trigger, Some(Trigger::BlinkStart | Trigger::BlinkStop)) {
                    toggles += 1;
                }
                t += FRAME_MS;
            }
        }

        prop_assert_eq!(toggles, expected);
    }

    #[test]
    fn equal_gaze_never_repeats_a_command(gazes in prop::collection::vec(gaze_strategy(), 1..40)) {
        let frame = GrayImage::new(8, 8);
        let t0 = Instant::now();
        let mut core = moving_core(&frame, t0);
        let mut t = 1800u64;
        let mut last_sent = Some(Command::Forward);

        for (index, gaze) in gazes.iter().enumerate() {
            let output = core.step(&frame, &faces(Eyes::Open(*gaze)), FAR, t0 + Duration::from_millis(t));
            if index > 0 && gazes[index - 1] == *gaze {
                prop_assert_eq!(output.command, None);
            }
            if let Some(command) = output.command {
                prop_assert_ne!(Some(command), last_sent);
                last_sent = Some(command);
            }
            t += FRAME_MS;
        }
    }

    #[test]
    fn stop_once_on_first_blocked_cycle(distances in prop::collection::vec(5.0f32..120.0, 1..40)) {
        let frame = GrayImage::new(8, 8);
        let t0 = Instant::now();
        let mut core = moving_core(&frame, t0);
        let mut t = 1800u64;
        let first_blocked = distances.iter().position(|d| *d < 20.0);

        let mut stops = Vec::new();
        for (index, distance) in distances.iter().enumerate() {
            let output = core.step(
                &frame,
                &faces(Eyes::Open(GazeBucket::Center)),
                Some(*distance),
                t0 + Duration::from_millis(t),
            );
            if output.command == Some(Command::Stop) {
                stops.push(index);
            }
            t += FRAME_MS;
        }

        match first_blocked {
            Some(index) => prop_assert_eq!(stops, vec![index]),
            None => prop_assert!(stops.is_empty()),
        }
    }

    #[test]
    fn repeated_input_commands_at_most_once(
        prefix in prop::collection::vec(
            (eyes_strategy(), prop::option::of(5.0f32..120.0), 0u64..800),
            0..30,
        ),
        last_eyes in eyes_strategy(),
        last_distance in prop::option::of(5.0f32..120.0),
        last_gap in 0u64..2000,
    ) {
        let frame = GrayImage::new(8, 8);
        let mut core = ControlCore::default();
        let t0 = Instant::now();
        let mut t = 0u64;

        for (eyes, distance, gap) in prefix {
            t += gap;
            core.step(&frame, &faces(eyes), distance, t0 + Duration::from_millis(t));
        }

        let now = t0 + Duration::from_millis(t + last_gap);
        let input = faces(last_eyes);
        core.step(&frame, &input, last_distance, now);
        let second = core.step(&frame, &input, last_distance, now);
        prop_assert_eq!(second.command, None);
    }
}
