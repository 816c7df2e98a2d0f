//! The durable object-store contract and its filesystem backend.

use std::path::PathBuf;

use async_trait::async_trait;
use reelcap_common::error::{ReelcapError, ReelcapResult};

/// Where a stored object landed.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Publicly dereferenceable URL.
    pub public_ref: String,

    /// Backend-internal path, usable with [`ObjectStore::delete`].
    pub storage_path: String,

    /// Stored size in bytes.
    pub size: u64,
}

/// Minimal durable-storage contract: store bytes under a path, delete by
/// storage path. Cloud backends live behind this same trait; nothing in
/// the pipeline depends on more.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn store(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> ReelcapResult<StoredObject>;

    /// Best-effort delete. Errors are logged and swallowed — the object may
    /// already be gone.
    async fn delete(&self, storage_path: &str);
}

/// Filesystem-backed object store: objects are files under a root, public
/// references are formed against a configured base URL.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> ReelcapResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ReelcapError::storage(format!(
                "Failed to create object root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, path: &str) -> ReelcapResult<PathBuf> {
        // Object paths are built from validated segments, but a second line
        // of defense costs nothing.
        if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(ReelcapError::storage(format!(
                "Refusing suspicious object path {path:?}"
            )));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn store(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> ReelcapResult<StoredObject> {
        let file_path = self.object_path(path)?;
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, bytes)?;

        tracing::info!(
            path,
            size = bytes.len(),
            content_type,
            "Stored object"
        );

        Ok(StoredObject {
            public_ref: format!("{}/{}", self.public_base_url, path),
            storage_path: path.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn delete(&self, storage_path: &str) {
        let file_path = match self.object_path(storage_path) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(storage_path, error = %e, "Skipping object delete");
                return;
            }
        };
        if let Err(e) = std::fs::remove_file(&file_path) {
            // The object may already be gone; deletion is best-effort.
            tracing::warn!(storage_path, error = %e, "Failed to delete object");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn store_and_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://localhost:8787/objects/").unwrap();

        let stored = store
            .store("users/u1/videos/a.mp4", b"mp4 bytes", "video/mp4")
            .await
            .unwrap();

        assert_eq!(stored.size, 9);
        assert_eq!(stored.storage_path, "users/u1/videos/a.mp4");
        assert_eq!(
            stored.public_ref,
            "http://localhost:8787/objects/users/u1/videos/a.mp4"
        );
        assert_eq!(
            std::fs::read(dir.path().join("users/u1/videos/a.mp4")).unwrap(),
            b"mp4 bytes"
        );

        store.delete(&stored.storage_path).await;
        assert!(!dir.path().join("users/u1/videos/a.mp4").exists());
    }

    #[tokio::test]
    async fn delete_of_missing_object_is_swallowed() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://base").unwrap();
        store.delete("users/u1/videos/never-stored.mp4").await;
    }

    #[tokio::test]
    async fn traversal_paths_are_refused() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("objects"), "http://base").unwrap();

        let err = store
            .store("../outside.mp4", b"x", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcapError::Storage { .. }));
        assert!(!dir.path().join("outside.mp4").exists());
    }
}
