// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pupil-position gaze classification
//!
//! Pipeline per eye:
//! 1. crop the landmark bounding box out of the grayscale frame
//! 2. resize to a fixed working size with a cubic filter
//! 3. Gaussian adaptive threshold, inverted, so dark pixels become foreground
//! 4. keep the largest 8-connected foreground region (the pupil)
//! 5. bucket the region's horizontal centroid against two fractions of the width
//!
//! Every degenerate case (empty box, no foreground, zero-area region) is
//! reported as [`GazeBucket::Center`].

use eyedrive_config::{GazeEye, VisionConfig};
use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::signals::{DetectedFace, EyeContour};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GazeBucket {
    Left,
    Center,
    Right,
}

impl std::fmt::Display for GazeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GazeBucket::Left => write!(f, "LEFT"),
            GazeBucket::Center => write!(f, "CENTER"),
            GazeBucket::Right => write!(f, "RIGHT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GazeSettings {
    pub eye: GazeEye,
    pub left_fraction: f32,
    pub right_fraction: f32,
    pub work_width: u32,
    pub work_height: u32,
    /// Odd neighbourhood size of the adaptive threshold
    pub block_size: u32,
    /// Subtracted from the weighted local mean
    pub offset: f32,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self::from(&VisionConfig::default())
    }
}

impl From<&VisionConfig> for GazeSettings {
    fn from(vision: &VisionConfig) -> Self {
        Self {
            eye: vision.gaze_eye,
            left_fraction: vision.gaze_left_fraction,
            right_fraction: vision.gaze_right_fraction,
            work_width: vision.work_width,
            work_height: vision.work_height,
            block_size: vision.adaptive_block_size,
            offset: vision.adaptive_offset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GazeClassifier {
    settings: GazeSettings,
    kernel: Vec<f32>,
}

impl Default for GazeClassifier {
    fn default() -> Self {
        Self::new(GazeSettings::default())
    }
}

impl GazeClassifier {
    pub fn new(settings: GazeSettings) -> Self {
        let kernel = gaussian_kernel(settings.block_size.max(3) | 1);
        Self { settings, kernel }
    }

    pub fn settings(&self) -> &GazeSettings {
        &self.settings
    }

    /// Classify the face using the configured eye(s)
    ///
    /// With [`GazeEye::Both`] the eyes must agree, otherwise the answer is
    /// [`GazeBucket::Center`].
    pub fn classify(&self, frame: &GrayImage, face: &DetectedFace) -> GazeBucket {
        match self.settings.eye {
            GazeEye::Left => self.classify_eye(frame, &face.left_eye),
            GazeEye::Right => self.classify_eye(frame, &face.right_eye),
            GazeEye::Both => {
                let left = self.classify_eye(frame, &face.left_eye);
                let right = self.classify_eye(frame, &face.right_eye);
                if left == right {
                    left
                } else {
                    GazeBucket::Center
                }
            }
        }
    }

    pub fn classify_eye(&self, frame: &GrayImage, eye: &EyeContour) -> GazeBucket {
        let Some(region) = self.eye_region(frame, eye) else {
            return GazeBucket::Center;
        };

        let mask = adaptive_threshold_inv(&region, &self.kernel, self.settings.offset);
        let Some(centroid_x) = largest_region_centroid_x(&mask, region.width(), region.height())
        else {
            return GazeBucket::Center;
        };

        let width = region.width() as f32;
        let bucket = if centroid_x < width * self.settings.left_fraction {
            GazeBucket::Left
        } else if centroid_x > width * self.settings.right_fraction {
            GazeBucket::Right
        } else {
            GazeBucket::Center
        };
        trace!(target: "eyedrive_core", "Pupil centroid x={:.1}/{} -> {}", centroid_x, width, bucket);
        bucket
    }

    /// Landmark bounding box, clamped to the frame and resized to the working size
    fn eye_region(&self, frame: &GrayImage, eye: &EyeContour) -> Option<GrayImage> {
        if self.settings.work_width == 0 || self.settings.work_height == 0 {
            return None;
        }
        let (min_x, max_x, min_y, max_y) = eye.iter().fold(
            (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
            |(x0, x1, y0, y1), p| (x0.min(p.x), x1.max(p.x), y0.min(p.y), y1.max(p.y)),
        );
        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            return None;
        }

        let clamp = |v: f32, limit: u32| v.max(0.0).min(limit as f32) as u32;
        let x0 = clamp(min_x.floor(), frame.width());
        let x1 = clamp(max_x.ceil(), frame.width());
        let y0 = clamp(min_y.floor(), frame.height());
        let y1 = clamp(max_y.ceil(), frame.height());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let crop = imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image();
        Some(imageops::resize(
            &crop,
            self.settings.work_width,
            self.settings.work_height,
            FilterType::CatmullRom,
        ))
    }
}

fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Foreground where the pixel is at or below its Gaussian-weighted local mean
/// minus `offset`. Borders replicate the edge pixel.
fn adaptive_threshold_inv(image: &GrayImage, kernel: &[f32], offset: f32) -> Vec<bool> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let half = (kernel.len() / 2) as isize;
    let pixels = image.as_raw();
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &pixels[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * row[clamp(x as isize + i as isize - half, w)] as f32)
                .sum();
        }
    }

    let mut mask = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let mean: f32 = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * horizontal[clamp(y as isize + i as isize - half, h) * w + x])
                .sum();
            mask[y * w + x] = (pixels[y * w + x] as f32) <= mean - offset;
        }
    }
    mask
}

/// Horizontal centroid of the largest 8-connected foreground region
fn largest_region_centroid_x(mask: &[bool], width: u32, height: u32) -> Option<f32> {
    let (w, h) = (width as usize, height as usize);
    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut best: Option<(usize, u64)> = None;

    for start in 0..w * h {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let (mut area, mut sum_x) = (0usize, 0u64);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            area += 1;
            sum_x += x as u64;
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let (nx, ny) = (x as isize + dx, y as isize + dy);
                    if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    }
                    let n = ny as usize * w + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if best.map_or(true, |(a, _)| area > a) {
            best = Some((area, sum_x));
        }
    }

    best.filter(|(area, _)| *area > 0)
        .map(|(area, sum_x)| sum_x as f32 / area as f32)
}
