//! Finalize: completeness check, encode, guaranteed staging release.

use std::sync::Arc;
use std::time::Duration;

use reelcap_common::config::{EncodeStrategy, EncoderConfig};
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{EncodedArtifact, FinalizeRequest, SessionId};
use reelcap_session_store::{SessionStore, StagingGuard};

use crate::ffmpeg::{
    concat_manifest_args, ffmpeg_available, image_sequence_args, resolve_ffmpeg, run_encoder,
};
use crate::frames::{convert_frames_to_png, write_concat_manifest};

/// Converts a complete session of staged frames into one MP4 artifact.
///
/// Finalize is all-or-nothing: the staging partition and any temporary
/// output are released on every exit path, success and failure alike, so a
/// session reaches its terminal state with no disk residue.
pub struct Finalizer {
    store: Arc<SessionStore>,
    config: EncoderConfig,
}

impl Finalizer {
    pub fn new(store: Arc<SessionStore>, config: EncoderConfig) -> Self {
        Self { store, config }
    }

    /// Whether the configured encoder binary is runnable.
    pub fn encoder_available(&self) -> bool {
        ffmpeg_available(&resolve_ffmpeg(&self.config))
    }

    /// Run one finalize attempt. Blocking — callers on an async runtime
    /// should dispatch through `spawn_blocking`.
    pub fn finalize(
        &self,
        session: &SessionId,
        request: &FinalizeRequest,
    ) -> ReelcapResult<EncodedArtifact> {
        request.validate()?;
        let geometry = request.geometry();

        tracing::info!(
            session = %session,
            total_frames = request.total_frames,
            fps = request.fps,
            %geometry,
            strategy = ?self.config.strategy,
            "Finalizing session"
        );

        let output = self
            .store
            .root()
            .join(format!("output-{session}.mp4"));
        let mut guard = StagingGuard::new(&self.store, session.clone());
        guard.track(&output);

        // Preconditions: every index in [0, total_frames) must be staged.
        // The encoder is never invoked for an incomplete session.
        if let Some(missing) = self
            .store
            .first_missing_index(session, request.total_frames)?
        {
            return Err(ReelcapError::missing_frame(missing));
        }

        let binary = resolve_ffmpeg(&self.config);
        let session_dir = self.store.session_dir(session);
        let args = match self.config.strategy {
            EncodeStrategy::ImageSequence => {
                convert_frames_to_png(&self.store, session, request.total_frames, geometry)?;
                image_sequence_args(&self.config, &session_dir, request.fps, &output)
            }
            EncodeStrategy::ConcatManifest => {
                let manifest = write_concat_manifest(&self.store, session, request.total_frames)?;
                concat_manifest_args(&self.config, &manifest, geometry, request.fps, &output)
            }
        };

        run_encoder(&binary, &args, Duration::from_secs(self.config.timeout_secs))?;

        if !output.is_file() {
            return Err(ReelcapError::encoding(
                "Encoder reported success but produced no output file",
            ));
        }
        let bytes = std::fs::read(&output)?;

        tracing::info!(session = %session, bytes = bytes.len(), "Finalize complete");
        Ok(EncodedArtifact::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcap_frame_model::FrameGeometry;
    use tempfile::tempdir;

    /// Encoder config whose binary cannot exist; if finalize ever reaches
    /// the encoder, the error kind flips from MissingFrame to Encoding.
    fn unreachable_encoder() -> EncoderConfig {
        EncoderConfig {
            ffmpeg_path: Some("/nonexistent/ffmpeg-binary".into()),
            ..EncoderConfig::default()
        }
    }

    fn request(total_frames: u64) -> FinalizeRequest {
        FinalizeRequest {
            total_frames,
            fps: 30,
            width: 4,
            height: 2,
        }
    }

    fn stage_frames(store: &SessionStore, session: &SessionId, indices: &[u64]) {
        let geometry = FrameGeometry::new(4, 2);
        store.ensure_session(session).unwrap();
        for &index in indices {
            store
                .write_frame(session, index, &vec![7u8; geometry.bytes_per_frame()])
                .unwrap();
        }
    }

    #[test]
    fn missing_frame_names_the_gap_and_skips_the_encoder() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let session = SessionId::parse("abc123").unwrap();
        stage_frames(&store, &session, &[0, 1, 3, 4]);

        let finalizer = Finalizer::new(Arc::clone(&store), unreachable_encoder());
        let err = finalizer.finalize(&session, &request(5)).unwrap_err();

        match err {
            ReelcapError::MissingFrame { index } => assert_eq!(index, 2),
            other => panic!("Expected MissingFrame, got {other:?}"),
        }
    }

    #[test]
    fn failed_finalize_still_releases_the_partition() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let session = SessionId::parse("abc123").unwrap();
        stage_frames(&store, &session, &[0]);

        let finalizer = Finalizer::new(Arc::clone(&store), unreachable_encoder());
        // Complete staging, but the encoder binary does not exist.
        let err = finalizer.finalize(&session, &request(1)).unwrap_err();
        assert!(matches!(err, ReelcapError::Encoding { .. }));

        assert!(!store.session_exists(&session));
    }

    #[test]
    fn unknown_session_is_missing_from_frame_zero() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let session = SessionId::parse("never-seen").unwrap();

        let finalizer = Finalizer::new(store, unreachable_encoder());
        let err = finalizer.finalize(&session, &request(3)).unwrap_err();
        assert!(matches!(err, ReelcapError::MissingFrame { index: 0 }));
    }

    #[test]
    fn invalid_request_is_rejected_before_any_disk_access() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let session = SessionId::parse("abc123").unwrap();
        stage_frames(&store, &session, &[0]);

        let finalizer = Finalizer::new(Arc::clone(&store), unreachable_encoder());
        let err = finalizer.finalize(&session, &request(0)).unwrap_err();
        assert!(matches!(err, ReelcapError::Validation { .. }));
        // A rejected request is not a finalize attempt; staging survives.
        assert!(store.session_exists(&session));
    }
}
