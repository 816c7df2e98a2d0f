//! The capture loop: deterministic sampling, batching, sequential upload.

use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{
    BatchHeader, EncodedArtifact, FinalizeRequest, SessionId, DEFAULT_BATCH_SIZE,
};

use crate::flip::flip_rows_into;
use crate::source::FrameSource;
use crate::transport::BatchSink;

/// Configuration for one capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Caller-generated session identifier.
    pub session_id: SessionId,

    /// Sampling frame rate.
    pub fps: u32,

    /// Frames accumulated before a batch is flushed.
    pub batch_size: u32,
}

impl CaptureConfig {
    pub fn new(session_id: SessionId, fps: u32) -> Self {
        Self {
            session_id,
            fps,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Stages of a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Sampling,
    Uploading,
    Finalizing,
    Complete,
}

/// Capture progress report.
#[derive(Debug, Clone)]
pub struct CaptureProgress {
    /// Overall progress [0.0, 1.0].
    pub progress: f64,

    /// Frames sampled so far.
    pub frames_captured: u64,

    /// Total frames to sample.
    pub total_frames: u64,

    /// Current stage.
    pub stage: CaptureStage,

    /// Human-readable status line.
    pub message: String,
}

/// Progress callback for capture runs.
pub type ProgressCallback = Box<dyn Fn(CaptureProgress) + Send>;

/// Fraction of overall progress assigned to sampling; the rest covers
/// upload tail and finalize.
const SAMPLING_PROGRESS_SPAN: f64 = 0.7;
const UPLOAD_PROGRESS_SPAN: f64 = 0.2;

/// Drives one complete capture: sample every frame, upload in order,
/// finalize, return the encoded artifact.
pub struct CaptureOrchestrator {
    config: CaptureConfig,
}

impl CaptureOrchestrator {
    pub fn new(config: CaptureConfig) -> ReelcapResult<Self> {
        if config.fps == 0 {
            return Err(ReelcapError::config("Capture fps must be non-zero"));
        }
        if config.batch_size == 0 {
            return Err(ReelcapError::config("Capture batch size must be non-zero"));
        }
        Ok(Self { config })
    }

    /// Run the capture against `source`, delivering through `sink`.
    ///
    /// Any upload failure aborts the whole capture — there is no
    /// partial-batch retry, only whole-capture abort.
    pub async fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &dyn BatchSink,
        progress: Option<ProgressCallback>,
    ) -> ReelcapResult<EncodedArtifact> {
        let geometry = source.geometry();
        geometry
            .validate()
            .map_err(|e| ReelcapError::config(format!("Capture source is not usable: {e}")))?;

        let duration_secs = source.duration_secs();
        if duration_secs <= 0.0 {
            return Err(ReelcapError::config(
                "Capture source has no playable duration",
            ));
        }

        let fps = self.config.fps;
        let total_frames = (duration_secs * fps as f64).ceil() as u64;
        let frame_len = geometry.bytes_per_frame();

        tracing::info!(
            session = %self.config.session_id,
            total_frames,
            %geometry,
            fps,
            batch_size = self.config.batch_size,
            "Starting capture"
        );

        let mut readback = vec![0u8; frame_len];
        let mut batch = Vec::with_capacity(self.config.batch_size as usize * frame_len);
        let mut batch_number = 0u64;
        let mut batch_start = 0u64;

        for index in 0..total_frames {
            let target_time = index as f64 / fps as f64;
            source.seek(target_time).await?;
            source.refresh().await?;
            // Two tick boundaries guarantee the renderer has committed the
            // sought frame before readback.
            source.tick().await?;
            source.tick().await?;
            source.read_pixels(&mut readback).await?;

            flip_rows_into(&readback, geometry, &mut batch);

            if let Some(cb) = &progress {
                cb(CaptureProgress {
                    progress: index as f64 / total_frames as f64 * SAMPLING_PROGRESS_SPAN,
                    frames_captured: index + 1,
                    total_frames,
                    stage: CaptureStage::Sampling,
                    message: format!("Capturing frame {}/{total_frames}", index + 1),
                });
            }

            let frames_in_batch = (index - batch_start + 1) as u32;
            if frames_in_batch == self.config.batch_size {
                self.flush_batch(
                    sink,
                    geometry,
                    batch_number,
                    batch_start,
                    frames_in_batch,
                    &mut batch,
                    total_frames,
                    &progress,
                )
                .await?;
                batch_number += 1;
                batch_start = index + 1;
            }
        }

        // Final partial batch.
        let remaining = (total_frames - batch_start) as u32;
        if remaining > 0 {
            self.flush_batch(
                sink,
                geometry,
                batch_number,
                batch_start,
                remaining,
                &mut batch,
                total_frames,
                &progress,
            )
            .await?;
        }

        if let Some(cb) = &progress {
            cb(CaptureProgress {
                progress: SAMPLING_PROGRESS_SPAN + UPLOAD_PROGRESS_SPAN,
                frames_captured: total_frames,
                total_frames,
                stage: CaptureStage::Finalizing,
                message: "Encoding video...".to_string(),
            });
        }

        let request = FinalizeRequest {
            total_frames,
            fps,
            width: geometry.width,
            height: geometry.height,
        };
        let artifact = sink.finalize(&self.config.session_id, &request).await?;

        tracing::info!(
            session = %self.config.session_id,
            bytes = artifact.len(),
            "Capture finalized"
        );

        if let Some(cb) = &progress {
            cb(CaptureProgress {
                progress: 1.0,
                frames_captured: total_frames,
                total_frames,
                stage: CaptureStage::Complete,
                message: "Capture complete".to_string(),
            });
        }

        Ok(artifact)
    }

    #[allow(clippy::too_many_arguments)]
    async fn flush_batch(
        &self,
        sink: &dyn BatchSink,
        geometry: reelcap_frame_model::FrameGeometry,
        batch_number: u64,
        start_frame: u64,
        frame_count: u32,
        batch: &mut Vec<u8>,
        total_frames: u64,
        progress: &Option<ProgressCallback>,
    ) -> ReelcapResult<()> {
        let header = BatchHeader {
            session_id: self.config.session_id.clone(),
            batch_number,
            start_frame,
            frame_count,
            geometry,
        };
        debug_assert_eq!(batch.len(), header.expected_payload_len());

        if let Some(cb) = progress {
            let batches_total = total_frames.div_ceil(self.config.batch_size as u64);
            cb(CaptureProgress {
                progress: SAMPLING_PROGRESS_SPAN
                    + batch_number as f64 / batches_total.max(1) as f64 * UPLOAD_PROGRESS_SPAN,
                frames_captured: start_frame + frame_count as u64,
                total_frames,
                stage: CaptureStage::Uploading,
                message: format!("Uploading batch {}...", batch_number + 1),
            });
        }

        tracing::debug!(
            session = %self.config.session_id,
            batch_number,
            start_frame,
            frame_count,
            bytes = batch.len(),
            "Uploading batch"
        );
        sink.send_batch(&header, batch).await?;
        batch.clear();
        Ok(())
    }
}
