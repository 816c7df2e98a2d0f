//! Frame batch headers and payload slicing.

use reelcap_common::error::{ReelcapError, ReelcapResult};
use serde::{Deserialize, Serialize};

use crate::geometry::FrameGeometry;
use crate::session::SessionId;

/// Default number of frames accumulated per upload batch.
pub const DEFAULT_BATCH_SIZE: u32 = 30;

/// Wire metadata accompanying one batch upload (flat for query-string use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchParams {
    pub batch_number: u64,
    pub start_frame: u64,
    pub frame_count: u32,
    pub width: u32,
    pub height: u32,
}

/// A fully-identified batch: session, position, and geometry.
///
/// Exists only for the duration of one upload request; the payload travels
/// separately as raw bytes.
#[derive(Debug, Clone)]
pub struct BatchHeader {
    pub session_id: SessionId,
    pub batch_number: u64,
    pub start_frame: u64,
    pub frame_count: u32,
    pub geometry: FrameGeometry,
}

impl BatchHeader {
    pub fn from_params(session_id: SessionId, params: &BatchParams) -> Self {
        Self {
            session_id,
            batch_number: params.batch_number,
            start_frame: params.start_frame,
            frame_count: params.frame_count,
            geometry: FrameGeometry::new(params.width, params.height),
        }
    }

    pub fn to_params(&self) -> BatchParams {
        BatchParams {
            batch_number: self.batch_number,
            start_frame: self.start_frame,
            frame_count: self.frame_count,
            width: self.geometry.width,
            height: self.geometry.height,
        }
    }

    /// Exact payload length this header promises.
    pub fn expected_payload_len(&self) -> usize {
        self.frame_count as usize * self.geometry.bytes_per_frame()
    }

    /// Validate geometry and that the payload matches `frame_count` whole
    /// frames. Nothing may be written when this fails.
    pub fn validate_payload(&self, payload_len: usize) -> ReelcapResult<()> {
        self.geometry.validate()?;
        let expected = self.expected_payload_len();
        if payload_len != expected {
            return Err(ReelcapError::validation(format!(
                "Batch {} payload is {payload_len} bytes, expected {expected} \
                 ({} frames of {} at {})",
                self.batch_number,
                self.frame_count,
                self.geometry.bytes_per_frame(),
                self.geometry,
            )));
        }
        Ok(())
    }

    /// Iterate `(global_frame_index, byte_range)` pairs over a validated
    /// payload, in frame order.
    pub fn frame_ranges(&self) -> impl Iterator<Item = (u64, std::ops::Range<usize>)> + '_ {
        let frame_len = self.geometry.bytes_per_frame();
        (0..self.frame_count as usize).map(move |local| {
            let start = local * frame_len;
            (self.start_frame + local as u64, start..start + frame_len)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(start_frame: u64, frame_count: u32, width: u32, height: u32) -> BatchHeader {
        BatchHeader {
            session_id: SessionId::parse("abc123").unwrap(),
            batch_number: 0,
            start_frame,
            frame_count,
            geometry: FrameGeometry::new(width, height),
        }
    }

    #[test]
    fn payload_length_must_match_exactly() {
        let batch = header(0, 2, 4, 2);
        let frame = batch.geometry.bytes_per_frame();
        assert!(batch.validate_payload(2 * frame).is_ok());
        assert!(batch.validate_payload(2 * frame - 1).is_err());
        assert!(batch.validate_payload(2 * frame + 1).is_err());
        assert!(batch.validate_payload(0).is_err());
    }

    #[test]
    fn zero_frame_batch_expects_empty_payload() {
        let batch = header(10, 0, 4, 2);
        assert_eq!(batch.expected_payload_len(), 0);
        assert!(batch.validate_payload(0).is_ok());
        assert_eq!(batch.frame_ranges().count(), 0);
    }

    #[test]
    fn frame_ranges_carry_global_indices() {
        let batch = header(30, 3, 2, 2);
        let frame = batch.geometry.bytes_per_frame();
        let ranges: Vec<_> = batch.frame_ranges().collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0], (30, 0..frame));
        assert_eq!(ranges[1], (31, frame..2 * frame));
        assert_eq!(ranges[2], (32, 2 * frame..3 * frame));
    }

    #[test]
    fn params_round_trip() {
        let batch = header(60, 12, 640, 480);
        let params = batch.to_params();
        let rebuilt = BatchHeader::from_params(batch.session_id.clone(), &params);
        assert_eq!(rebuilt.start_frame, 60);
        assert_eq!(rebuilt.frame_count, 12);
        assert_eq!(rebuilt.geometry, batch.geometry);
    }

    proptest! {
        #[test]
        fn ranges_tile_the_payload_without_gaps(
            start_frame in 0u64..10_000,
            frame_count in 1u32..64,
            width in 1u32..32,
            height in 1u32..32,
        ) {
            let batch = header(start_frame, frame_count, width, height);
            let frame_len = batch.geometry.bytes_per_frame();
            let mut expected_offset = 0usize;
            let mut expected_index = start_frame;
            for (index, range) in batch.frame_ranges() {
                prop_assert_eq!(index, expected_index);
                prop_assert_eq!(range.start, expected_offset);
                prop_assert_eq!(range.end - range.start, frame_len);
                expected_offset = range.end;
                expected_index += 1;
            }
            prop_assert_eq!(expected_offset, batch.expected_payload_len());
        }
    }
}
