//! What an encode should produce, decided before any pixels are touched.
//!
//! [`operations`](super::operations) fills these in from the source size and
//! the upload settings; the [`backend`](super::backend) carries them out.
//! Tests assert on them through the mock backend.

use std::path::PathBuf;

/// JPEG quality, 1 to 100. Out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// One source to decode, resize and encode as JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct JpegParams {
    pub source: PathBuf,
    /// Output dimensions; equal to the source dimensions when no resize is needed.
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
