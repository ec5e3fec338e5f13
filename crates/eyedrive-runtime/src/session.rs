// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Recorded session replay
//!
//! A session is a JSON-lines file, one record per camera frame:
//!
//! ```text
//! {"t_ms": 0,    "faces": [{"left_eye": [[x,y],...], "right_eye": [...], "gaze_hint": "CENTER"}], "distance": 80.0}
//! {"t_ms": 33,   "faces": [], "distance": null}
//! {"image": "frames/0002.png", "faces": [...], "distance": 45.5}
//! {"capture_error": "camera unplugged"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. `t_ms` is the offset
//! from the start of the session; when missing, the previous offset plus the
//! frame interval is used. `distance: null` (or a missing field) replays a
//! failed ranging request. `image` is resolved relative to the session file
//! and converted to grayscale; without it a blank frame is used.
//!
//! [`Session::into_replay`] splits the session into a frame source, a signal
//! extractor and a range sensor that all follow the same cursor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eyedrive_core::{DetectedFace, SignalExtractor};
use eyedrive_hal::{HalError, HalResult, RangeSensor};
use image::{GrayImage, Luma};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sources::{CapturedFrame, FrameSource};
use crate::{RuntimeError, RuntimeResult};

pub const DEFAULT_FRAME_SIZE: (u32, u32) = (320, 240);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_ms: Option<u64>,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    #[serde(default)]
    pub distance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<SessionRecord>,
    base_dir: PathBuf,
}

impl Session {
    pub fn load(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RuntimeError::SessionIo {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let session = Self::parse(&text, base_dir)?;
        info!(target: "eyedrive_runtime", "Loaded session {} ({} frames)", path.display(), session.len());
        Ok(session)
    }

    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> RuntimeResult<Self> {
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: SessionRecord =
                serde_json::from_str(line).map_err(|e| RuntimeError::SessionFormat {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(Self {
            records,
            base_dir: base_dir.into(),
        })
    }

    pub fn from_records(records: Vec<SessionRecord>) -> Self {
        Self {
            records,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_replay(self, frame_interval: Duration) -> (ReplayFrames, ReplayExtractor, ReplayRanging) {
        let current = Arc::new(Mutex::new(None));
        let (width, height) = DEFAULT_FRAME_SIZE;
        let frames = ReplayFrames {
            records: self.records.into_iter(),
            current: Arc::clone(&current),
            base_dir: self.base_dir,
            blank: GrayImage::from_pixel(width, height, Luma([128])),
            frame_interval,
            last_offset: None,
        };
        (
            frames,
            ReplayExtractor {
                current: Arc::clone(&current),
            },
            ReplayRanging { current },
        )
    }
}

type Cursor = Arc<Mutex<Option<SessionRecord>>>;

pub struct ReplayFrames {
    records: std::vec::IntoIter<SessionRecord>,
    current: Cursor,
    base_dir: PathBuf,
    blank: GrayImage,
    frame_interval: Duration,
    last_offset: Option<Duration>,
}

impl ReplayFrames {
    fn load_image(&self, relative: &Path) -> RuntimeResult<GrayImage> {
        let path = self.base_dir.join(relative);
        image::open(&path)
            .map(|img| img.to_luma8())
            .map_err(|e| RuntimeError::FrameImage {
                path,
                message: e.to_string(),
            })
    }
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> RuntimeResult<Option<CapturedFrame>> {
        let Some(record) = self.records.next() else {
            *self.current.lock() = None;
            debug!(target: "eyedrive_runtime", "Session exhausted");
            return Ok(None);
        };

        if let Some(reason) = &record.capture_error {
            *self.current.lock() = None;
            return Err(RuntimeError::Capture(reason.clone()));
        }

        let offset = match (record.t_ms, self.last_offset) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Some(last)) => last + self.frame_interval,
            (None, None) => Duration::ZERO,
        };
        self.last_offset = Some(offset);

        let image = match &record.image {
            Some(relative) => self.load_image(relative)?,
            None => self.blank.clone(),
        };

        *self.current.lock() = Some(record);
        Ok(Some(CapturedFrame {
            image,
            offset: Some(offset),
        }))
    }
}

/// Faces of the current session record
pub struct ReplayExtractor {
    current: Cursor,
}

impl SignalExtractor for ReplayExtractor {
    fn detect(&mut self, _frame: &GrayImage) -> Vec<DetectedFace> {
        self.current
            .lock()
            .as_ref()
            .map(|record| record.faces.clone())
            .unwrap_or_default()
    }
}

/// Distance of the current session record
pub struct ReplayRanging {
    current: Cursor,
}

impl RangeSensor for ReplayRanging {
    fn read_distance(&mut self) -> HalResult<f32> {
        self.current
            .lock()
            .as_ref()
            .and_then(|record| record.distance)
            .ok_or(HalError::Timeout {
                operation: "replay distance",
                waited_ms: 0,
            })
    }
}
