//! Frame sources: the time-seekable rendered surfaces capture reads from.

use async_trait::async_trait;
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::FrameGeometry;

/// A time-driven rendered surface that frames can be sampled from.
///
/// The orchestrator drives the source one target time at a time: seek, force
/// a content refresh, wait out two render ticks, then read back. `seek` must
/// resolve only once the seek has actually committed, and `tick` only at a
/// render-loop tick boundary — those suspension points are what make
/// sampling deterministic under asynchronous rendering.
///
/// Readback is raw RGBA8, bottom-up row order (row 0 of the buffer is the
/// bottom row of the image). The orchestrator performs the row reversal.
#[async_trait]
pub trait FrameSource: Send {
    /// Pixel dimensions of the rendering surface.
    fn geometry(&self) -> FrameGeometry;

    /// Length of the underlying time source in seconds.
    fn duration_secs(&self) -> f64;

    /// Seek the time source; resolves when the seek has committed.
    async fn seek(&mut self, time_secs: f64) -> ReelcapResult<()>;

    /// Force a texture/content refresh for the current time.
    async fn refresh(&mut self) -> ReelcapResult<()>;

    /// Suspend until the next render-loop tick boundary.
    async fn tick(&mut self) -> ReelcapResult<()>;

    /// Read `width * height * 4` bytes from the surface into `out`.
    async fn read_pixels(&mut self, out: &mut [u8]) -> ReelcapResult<()>;
}

/// Fill pattern for [`SyntheticSource`].
#[derive(Debug, Clone, Copy)]
pub enum SyntheticPattern {
    /// Every pixel the same RGBA color.
    Solid([u8; 4]),
    /// Linear blend from `top` at the top row to `bottom` at the bottom row.
    VerticalGradient { top: [u8; 4], bottom: [u8; 4] },
}

/// Deterministic software source for tests and the CLI demo path.
///
/// Renders the configured pattern bottom-up, exactly as a GPU readback
/// would, and counts every suspension point so tests can assert the
/// orchestrator's sampling discipline.
pub struct SyntheticSource {
    geometry: FrameGeometry,
    duration_secs: f64,
    pattern: SyntheticPattern,
    current_time: f64,
    pub seeks: u64,
    pub refreshes: u64,
    pub ticks: u64,
    pub reads: u64,
}

impl SyntheticSource {
    pub fn new(geometry: FrameGeometry, duration_secs: f64, pattern: SyntheticPattern) -> Self {
        Self {
            geometry,
            duration_secs,
            pattern,
            current_time: 0.0,
            seeks: 0,
            refreshes: 0,
            ticks: 0,
            reads: 0,
        }
    }

    pub fn solid(geometry: FrameGeometry, duration_secs: f64, color: [u8; 4]) -> Self {
        Self::new(geometry, duration_secs, SyntheticPattern::Solid(color))
    }

    fn pixel_at(&self, visual_row: u32) -> [u8; 4] {
        match self.pattern {
            SyntheticPattern::Solid(color) => color,
            SyntheticPattern::VerticalGradient { top, bottom } => {
                let denom = (self.geometry.height - 1).max(1) as f64;
                let t = visual_row as f64 / denom;
                let mut out = [0u8; 4];
                for (i, channel) in out.iter_mut().enumerate() {
                    *channel =
                        (top[i] as f64 + (bottom[i] as f64 - top[i] as f64) * t).round() as u8;
                }
                out
            }
        }
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    async fn seek(&mut self, time_secs: f64) -> ReelcapResult<()> {
        self.current_time = time_secs;
        self.seeks += 1;
        Ok(())
    }

    async fn refresh(&mut self) -> ReelcapResult<()> {
        self.refreshes += 1;
        Ok(())
    }

    async fn tick(&mut self) -> ReelcapResult<()> {
        self.ticks += 1;
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn read_pixels(&mut self, out: &mut [u8]) -> ReelcapResult<()> {
        let expected = self.geometry.bytes_per_frame();
        if out.len() != expected {
            return Err(ReelcapError::validation(format!(
                "Readback buffer is {} bytes, surface needs {expected}",
                out.len()
            )));
        }

        // Bottom-up: buffer row 0 is the bottom visual row.
        let row_len = self.geometry.bytes_per_row();
        for buffer_row in 0..self.geometry.height {
            let visual_row = self.geometry.height - 1 - buffer_row;
            let pixel = self.pixel_at(visual_row);
            let start = buffer_row as usize * row_len;
            for x in 0..self.geometry.width as usize {
                out[start + x * 4..start + x * 4 + 4].copy_from_slice(&pixel);
            }
        }
        self.reads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_readback_is_bottom_up() {
        let geometry = FrameGeometry::new(2, 2);
        let mut source = SyntheticSource::new(
            geometry,
            1.0,
            SyntheticPattern::VerticalGradient {
                top: [0, 0, 0, 255],
                bottom: [200, 0, 0, 255],
            },
        );

        let mut buf = vec![0u8; geometry.bytes_per_frame()];
        source.read_pixels(&mut buf).await.unwrap();

        // Buffer row 0 must be the bottom (red) row.
        assert_eq!(buf[0], 200);
        // Buffer row 1 must be the top (black) row.
        assert_eq!(buf[geometry.bytes_per_row()], 0);
    }

    #[tokio::test]
    async fn wrong_buffer_size_is_rejected() {
        let geometry = FrameGeometry::new(2, 2);
        let mut source = SyntheticSource::solid(geometry, 1.0, [1, 2, 3, 4]);
        let mut short = vec![0u8; 3];
        assert!(source.read_pixels(&mut short).await.is_err());
    }
}
