//! End-to-end encode tests driven through a real ffmpeg binary.
//!
//! Every test skips itself when no runnable ffmpeg is found, so the suite
//! stays green on hosts without the external encoder.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use reelcap_common::config::{EncodeStrategy, EncoderConfig};
use reelcap_encode_engine::{ffmpeg_available, resolve_ffmpeg, Finalizer};
use reelcap_frame_model::{FinalizeRequest, FrameGeometry, SessionId};
use reelcap_session_store::SessionStore;
use tempfile::tempdir;

/// Mid-range color so codec quantization cannot clip it.
const COLOR: [u8; 4] = [64, 128, 192, 255];

/// Allowed per-channel drift after an H.264/yuv420p round trip.
const COLOR_TOLERANCE: f64 = 12.0;

fn ffmpeg() -> Option<PathBuf> {
    let binary = resolve_ffmpeg(&EncoderConfig::default());
    ffmpeg_available(&binary).then_some(binary)
}

fn stage_solid_session(
    store: &SessionStore,
    session: &SessionId,
    geometry: FrameGeometry,
    total_frames: u64,
) {
    let frame: Vec<u8> = COLOR
        .iter()
        .copied()
        .cycle()
        .take(geometry.bytes_per_frame())
        .collect();
    store.ensure_session(session).unwrap();
    for index in 0..total_frames {
        store.write_frame(session, index, &frame).unwrap();
    }
}

/// Decode an MP4 back to raw RGBA via ffmpeg's rawvideo output.
fn decode_rgba(binary: &Path, mp4: &Path) -> Vec<u8> {
    let output = Command::new(binary)
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(mp4)
        .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"])
        .output()
        .expect("ffmpeg decode should run");
    assert!(
        output.status.success(),
        "decode failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

fn assert_mean_color_per_frame(decoded: &[u8], geometry: FrameGeometry) {
    let frame_len = geometry.bytes_per_frame();
    for (frame_index, frame) in decoded.chunks_exact(frame_len).enumerate() {
        for channel in 0..3 {
            let sum: u64 = frame
                .chunks_exact(4)
                .map(|pixel| pixel[channel] as u64)
                .sum();
            let mean = sum as f64 / (frame_len / 4) as f64;
            let expected = COLOR[channel] as f64;
            assert!(
                (mean - expected).abs() <= COLOR_TOLERANCE,
                "frame {frame_index} channel {channel}: mean {mean:.1}, expected {expected}"
            );
        }
    }
}

fn run_scenario(strategy: EncodeStrategy, geometry: FrameGeometry, total_frames: u64, fps: u32) {
    let Some(binary) = ffmpeg() else {
        eprintln!("ffmpeg not found, skipping encode test");
        return;
    };

    let dir = tempdir().unwrap();
    let store = Arc::new(SessionStore::new(dir.path().join("staging")).unwrap());
    let session = SessionId::parse("abc123").unwrap();
    stage_solid_session(&store, &session, geometry, total_frames);

    let config = EncoderConfig {
        strategy,
        ..EncoderConfig::default()
    };
    let finalizer = Finalizer::new(Arc::clone(&store), config);
    let request = FinalizeRequest {
        total_frames,
        fps,
        width: geometry.width,
        height: geometry.height,
    };

    let artifact = finalizer.finalize(&session, &request).unwrap();

    // Valid MP4 container: the ftyp box leads the file.
    assert!(artifact.len() > 8);
    assert_eq!(&artifact.bytes[4..8], b"ftyp");

    // Finalize released the staging partition and its temp output.
    assert!(!store.session_exists(&session));
    assert!(!store.root().join("output-abc123.mp4").exists());

    // Round trip: decoded frame count within one of the input, solid color
    // preserved within codec tolerance.
    let mp4 = dir.path().join("roundtrip.mp4");
    std::fs::write(&mp4, &artifact.bytes).unwrap();
    let decoded = decode_rgba(&binary, &mp4);

    let frames = decoded.len() / geometry.bytes_per_frame();
    assert!(
        (frames as i64 - total_frames as i64).abs() <= 1,
        "decoded {frames} frames, staged {total_frames}"
    );
    assert_mean_color_per_frame(&decoded, geometry);
}

#[test]
fn image_sequence_scenario_two_batches_of_thirty() {
    // The canonical scenario: 640x480 at 30 fps, 60 frames staged as two
    // batches of 30 -> a ~2.0s MP4.
    run_scenario(
        EncodeStrategy::ImageSequence,
        FrameGeometry::new(640, 480),
        60,
        30,
    );
}

#[test]
fn concat_manifest_strategy_yields_equivalent_output() {
    run_scenario(
        EncodeStrategy::ConcatManifest,
        FrameGeometry::new(640, 480),
        60,
        30,
    );
}

#[test]
fn odd_dimensions_are_scaled_to_even() {
    let Some(binary) = ffmpeg() else {
        eprintln!("ffmpeg not found, skipping encode test");
        return;
    };

    let dir = tempdir().unwrap();
    let store = Arc::new(SessionStore::new(dir.path().join("staging")).unwrap());
    let session = SessionId::parse("odd-dims").unwrap();
    let geometry = FrameGeometry::new(63, 31);
    stage_solid_session(&store, &session, geometry, 5);

    let finalizer = Finalizer::new(Arc::clone(&store), EncoderConfig::default());
    let request = FinalizeRequest {
        total_frames: 5,
        fps: 30,
        width: geometry.width,
        height: geometry.height,
    };

    // Without the even-dimension scale filter libx264 rejects 63x31.
    let artifact = finalizer.finalize(&session, &request).unwrap();
    assert_eq!(&artifact.bytes[4..8], b"ftyp");

    let mp4 = dir.path().join("odd.mp4");
    std::fs::write(&mp4, &artifact.bytes).unwrap();
    let decoded = decode_rgba(&binary, &mp4);
    let even = FrameGeometry::new(62, 30);
    assert_eq!(decoded.len() % even.bytes_per_frame(), 0);
}
