//! Staged-frame preparation: PNG conversion and concat manifests.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{FrameGeometry, SessionId};
use reelcap_session_store::{SessionStore, FRAME_INDEX_DIGITS};

/// Path of the converted still for one frame index.
pub fn png_path(session_dir: &Path, index: u64) -> PathBuf {
    session_dir.join(format!("frame-{index:0width$}.png", width = FRAME_INDEX_DIGITS))
}

/// Path of the concat manifest inside a session partition.
pub fn manifest_path(session_dir: &Path) -> PathBuf {
    session_dir.join("frames.txt")
}

/// Convert every staged raw frame to a lossless PNG keyed by the same
/// zero-padded index, deleting each raw source as it goes so peak disk
/// stays near one copy of the session.
pub fn convert_frames_to_png(
    store: &SessionStore,
    session: &SessionId,
    total_frames: u64,
    geometry: FrameGeometry,
) -> ReelcapResult<()> {
    let session_dir = store.session_dir(session);
    for index in 0..total_frames {
        let raw = store.read_frame(session, index)?;
        if raw.len() != geometry.bytes_per_frame() {
            return Err(ReelcapError::validation(format!(
                "Staged frame {index} is {} bytes, expected {} for {geometry}",
                raw.len(),
                geometry.bytes_per_frame()
            )));
        }

        let image: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(geometry.width, geometry.height, raw).ok_or_else(|| {
                ReelcapError::encoding(format!("Frame {index} does not fit {geometry}"))
            })?;
        let png = png_path(&session_dir, index);
        image
            .save(&png)
            .map_err(|e| ReelcapError::encoding(format!("Failed to write {}: {e}", png.display())))?;

        store.remove_frame(session, index)?;

        if index % 30 == 0 {
            tracing::debug!(converted = index + 1, total_frames, "Converting frames to PNG");
        }
    }
    tracing::info!(total_frames, "Frame conversion complete");
    Ok(())
}

/// Write an ordered manifest listing every raw frame path in playback
/// order, for ffmpeg's concat demuxer.
pub fn write_concat_manifest(
    store: &SessionStore,
    session: &SessionId,
    total_frames: u64,
) -> ReelcapResult<PathBuf> {
    let session_dir = store.session_dir(session);
    let path = manifest_path(&session_dir);
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
    for index in 0..total_frames {
        let frame = store.frame_path(session, index);
        writeln!(writer, "file '{}'", frame.display())?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), total_frames, "Wrote concat manifest");
    Ok(path)
}
