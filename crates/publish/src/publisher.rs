//! Publishing encoded artifacts and delivering them locally.

use std::path::Path;
use std::sync::Arc;

use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{EncodedArtifact, PublishReceipt, ARTIFACT_CONTENT_TYPE};

use crate::metadata::{MetadataSink, VideoRecord};
use crate::store::ObjectStore;

/// Persists encoded artifacts to object storage and records their metadata.
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataSink>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataSink>) -> Self {
        Self { store, metadata }
    }

    /// Store `artifact` under the owner's video path and create a metadata
    /// record for it.
    pub async fn publish(
        &self,
        owner: &str,
        file_name: &str,
        artifact: &EncodedArtifact,
    ) -> ReelcapResult<PublishReceipt> {
        validate_segment("owner", owner)?;
        validate_segment("file_name", file_name)?;

        let path = format!("users/{owner}/videos/{file_name}");
        let stored = self
            .store
            .store(&path, &artifact.bytes, ARTIFACT_CONTENT_TYPE)
            .await?;

        let content_id = new_content_id();
        let record = VideoRecord {
            content_id: content_id.clone(),
            owner: owner.to_string(),
            public_ref: stored.public_ref.clone(),
            storage_path: stored.storage_path.clone(),
            size: stored.size,
            content_type: ARTIFACT_CONTENT_TYPE.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.metadata.create(&record)?;

        tracing::info!(
            owner,
            content_id = %content_id,
            public_ref = %stored.public_ref,
            size = stored.size,
            "Published video"
        );

        Ok(PublishReceipt {
            content_id,
            public_ref: stored.public_ref,
            storage_path: stored.storage_path,
            size: stored.size,
        })
    }
}

/// Materialize the artifact at a local path for the caller.
///
/// Independent of publishing: callers run both and report each outcome on
/// its own.
pub fn deliver(artifact: &EncodedArtifact, path: &Path) -> ReelcapResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &artifact.bytes)?;
    tracing::info!(path = %path.display(), bytes = artifact.len(), "Delivered video");
    Ok(())
}

fn new_content_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    format!("vid-{nanos}")
}

fn validate_segment(what: &str, value: &str) -> ReelcapResult<()> {
    let ok = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if !ok || value.starts_with('.') {
        return Err(ReelcapError::validation(format!(
            "Invalid {what} {value:?}: expected [A-Za-z0-9._-], not starting with '.'"
        )));
    }
    Ok(())
}
