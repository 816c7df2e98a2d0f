//! ffmpeg resolution, argument construction, and subprocess execution.
//!
//! Commands are always built as explicit argument vectors — never by string
//! interpolation into a shell.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use reelcap_common::config::EncoderConfig;
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::FrameGeometry;

/// libx264 rejects odd dimensions; round both down to even.
const EVEN_SCALE_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Poll interval while waiting on the encoder process.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Locate the ffmpeg binary: `FFMPEG_PATH` env, then config, then PATH.
pub fn resolve_ffmpeg(config: &EncoderConfig) -> PathBuf {
    if let Ok(path) = std::env::var("FFMPEG_PATH") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &config.ffmpeg_path {
        return path.clone();
    }
    PathBuf::from("ffmpeg")
}

/// Whether the encoder binary can be executed.
pub fn ffmpeg_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Output arguments shared by both strategies: codec, quality, bitrate
/// ceiling, pixel format, even-dimension scaling, faststart.
fn codec_args(config: &EncoderConfig) -> Vec<String> {
    vec![
        "-vf".to_string(),
        EVEN_SCALE_FILTER.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        config.preset.clone(),
        "-crf".to_string(),
        config.crf.to_string(),
        "-b:v".to_string(),
        format!("{}k", config.video_bitrate_kbps),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

fn common_prefix() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

/// Arguments for encoding a PNG sequence (`frame-%06d.png`) in `input_dir`.
pub fn image_sequence_args(
    config: &EncoderConfig,
    input_dir: &Path,
    fps: u32,
    output: &Path,
) -> Vec<String> {
    let mut args = common_prefix();
    args.push("-framerate".to_string());
    args.push(fps.to_string());
    args.push("-i".to_string());
    args.push(input_dir.join("frame-%06d.png").display().to_string());
    args.extend(codec_args(config));
    args.push(output.display().to_string());
    args
}

/// Arguments for encoding raw RGBA frames through a concat manifest.
pub fn concat_manifest_args(
    config: &EncoderConfig,
    manifest: &Path,
    geometry: FrameGeometry,
    fps: u32,
    output: &Path,
) -> Vec<String> {
    let mut args = common_prefix();
    args.push("-f".to_string());
    args.push("rawvideo".to_string());
    args.push("-pixel_format".to_string());
    args.push("rgba".to_string());
    args.push("-video_size".to_string());
    args.push(geometry.to_string());
    args.push("-framerate".to_string());
    args.push(fps.to_string());
    args.push("-f".to_string());
    args.push("concat".to_string());
    args.push("-safe".to_string());
    args.push("0".to_string());
    args.push("-i".to_string());
    args.push(manifest.display().to_string());
    args.extend(codec_args(config));
    args.push(output.display().to_string());
    args
}

/// Captured output of a successful encoder run.
#[derive(Debug)]
pub struct EncoderOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run the encoder synchronously with captured output and a wall-clock
/// timeout. Non-zero exit, spawn failure, and timeout all surface as
/// `Encoding` errors carrying the tool's diagnostics.
pub fn run_encoder(
    binary: &Path,
    args: &[String],
    timeout: Duration,
) -> ReelcapResult<EncoderOutput> {
    tracing::debug!(binary = %binary.display(), ?args, "Running encoder");

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ReelcapError::encoding(format!("Failed to start {}: {e}", binary.display()))
        })?;

    // Drain both pipes concurrently; log volume scales with frame count and
    // a full pipe would deadlock the child.
    let stdout_task = drain_pipe(child.stdout.take());
    let stderr_task = drain_pipe(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let stderr = join_drain(stderr_task);
                    let _ = join_drain(stdout_task);
                    return Err(ReelcapError::encoding(format!(
                        "Encoder timed out after {}s: {}",
                        timeout.as_secs(),
                        stderr.trim()
                    )));
                }
                std::thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ReelcapError::encoding(format!(
                    "Failed to wait on encoder: {e}"
                )));
            }
        }
    };

    let stdout = join_drain(stdout_task);
    let stderr = join_drain(stderr_task);

    if !status.success() {
        return Err(ReelcapError::encoding(format!(
            "Encoder exited with {status}: {}",
            stderr.trim()
        )));
    }

    tracing::info!(elapsed_secs = started.elapsed().as_secs_f64(), "Encoder finished");
    Ok(EncoderOutput { stdout, stderr })
}

fn drain_pipe<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<std::thread::JoinHandle<String>> {
    pipe.map(|mut reader| {
        std::thread::spawn(move || {
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read encoder output: {err}>"),
            }
        })
    })
}

fn join_drain(task: Option<std::thread::JoinHandle<String>>) -> String {
    task.and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
