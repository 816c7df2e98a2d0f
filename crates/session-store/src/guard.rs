//! Scoped acquisition of a session's staging partition.

use std::path::PathBuf;

use reelcap_frame_model::SessionId;

use crate::store::SessionStore;

/// Holds a session's staging partition for the duration of a finalize
/// attempt and releases it on drop — success and failure paths alike.
///
/// Extra temporary paths (the encoder's output file, a concat manifest
/// outside the partition) can be attached with [`StagingGuard::track`] and
/// are removed with the partition. Release failures are logged, never
/// raised: a session reaches its terminal state exactly once, and a stuck
/// file must not mask the finalize outcome.
pub struct StagingGuard<'a> {
    store: &'a SessionStore,
    session: SessionId,
    extra_paths: Vec<PathBuf>,
}

impl<'a> StagingGuard<'a> {
    pub fn new(store: &'a SessionStore, session: SessionId) -> Self {
        Self {
            store,
            session,
            extra_paths: Vec::new(),
        }
    }

    /// Also remove `path` when the guard releases.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.extra_paths.push(path.into());
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        for path in &self.extra_paths {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove finalize artifact");
                }
            }
        }
        if let Err(e) = self.store.remove_session(&self.session) {
            tracing::warn!(session = %self.session, error = %e, "Failed to release staging partition");
        } else {
            tracing::debug!(session = %self.session, "Staging partition released");
        }
    }
}
