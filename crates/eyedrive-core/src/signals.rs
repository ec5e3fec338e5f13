// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Landmark data handed over by the face/eye extractor

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::gaze::GazeBucket;

/// Image-space coordinate, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Six eye landmarks in the 68-point convention:
/// outer corner, two upper lid points, inner corner, two lower lid points.
pub type EyeContour = [Point; 6];

/// One face as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub left_eye: EyeContour,
    pub right_eye: EyeContour,
    /// Gaze already classified by the extractor; wins over pixel classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze_hint: Option<GazeBucket>,
}

impl DetectedFace {
    pub fn new(left_eye: EyeContour, right_eye: EyeContour) -> Self {
        Self {
            left_eye,
            right_eye,
            gaze_hint: None,
        }
    }

    pub fn with_gaze_hint(mut self, gaze: GazeBucket) -> Self {
        self.gaze_hint = Some(gaze);
        self
    }
}

/// Face detection and landmark extraction (external collaborator)
///
/// An empty vector is a valid answer: nobody is in front of the camera.
pub trait SignalExtractor {
    fn detect(&mut self, frame: &GrayImage) -> Vec<DetectedFace>;
}
