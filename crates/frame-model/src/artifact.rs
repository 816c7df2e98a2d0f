//! The finalize output artifact and its publish receipt.

use serde::{Deserialize, Serialize};

/// MIME type of the finalized container.
pub const ARTIFACT_CONTENT_TYPE: &str = "video/mp4";

/// A finalized, compressed video: MP4 container, H.264 video, yuv420p pixel
/// format. Ephemeral — lives in memory between finalize and publish/delivery.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
}

impl EncodedArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        ARTIFACT_CONTENT_TYPE
    }
}

/// Wire response of a successful publish: where the artifact now lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Metadata record id for the published video.
    pub content_id: String,

    /// Publicly dereferenceable URL.
    pub public_ref: String,

    /// Backend-internal path, usable with the store's delete.
    pub storage_path: String,

    /// Stored size in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_round_trips_through_json() {
        let receipt = PublishReceipt {
            content_id: "vid-1733452800123".to_string(),
            public_ref: "http://localhost:8787/objects/users/u1/videos/a.mp4".to_string(),
            storage_path: "users/u1/videos/a.mp4".to_string(),
            size: 12345,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let parsed: PublishReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content_id, receipt.content_id);
        assert_eq!(parsed.size, 12345);
    }
}
