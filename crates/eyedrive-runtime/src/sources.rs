// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use image::GrayImage;

use crate::RuntimeResult;

/// One grayscale camera frame
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: GrayImage,
    /// Capture time relative to the start of the source. Live sources leave
    /// this empty and the loop stamps the frame with the wall clock.
    pub offset: Option<Duration>,
}

/// Camera abstraction
///
/// `Ok(None)` means the source has ended. Both an end and an error stop the
/// control loop.
pub trait FrameSource {
    fn next_frame(&mut self) -> RuntimeResult<Option<CapturedFrame>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> RuntimeResult<Option<CapturedFrame>> {
        (**self).next_frame()
    }
}
