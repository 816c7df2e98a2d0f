//! Row-order correction for readback buffers.
//!
//! GPU readback returns rows bottom-up; everything downstream (PNG
//! conversion, rawvideo input) expects top-down order.

use reelcap_frame_model::FrameGeometry;

/// Append `src` to `out` with rows reversed: output row `y` is source row
/// `height - 1 - y`.
pub fn flip_rows_into(src: &[u8], geometry: FrameGeometry, out: &mut Vec<u8>) {
    debug_assert_eq!(src.len(), geometry.bytes_per_frame());
    let row = geometry.bytes_per_row();
    for y in (0..geometry.height as usize).rev() {
        out.extend_from_slice(&src[y * row..(y + 1) * row]);
    }
}

/// Row-reversed copy of one frame.
pub fn flip_rows(src: &[u8], geometry: FrameGeometry) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    flip_rows_into(src, geometry, &mut out);
    out
}
