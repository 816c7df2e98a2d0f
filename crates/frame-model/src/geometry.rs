//! Frame geometry and pixel layout.

use reelcap_common::error::{ReelcapError, ReelcapResult};
use serde::{Deserialize, Serialize};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel dimensions of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Byte length of one raw RGBA frame at this geometry.
    pub fn bytes_per_frame(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Byte length of one row.
    pub fn bytes_per_row(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Reject zero-sized frames before any buffer is allocated.
    pub fn validate(&self) -> ReelcapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelcapError::validation(format!(
                "Frame geometry must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
