//! Content-metadata records, consumed as a black box.

use std::path::PathBuf;
use std::sync::Mutex;

use reelcap_common::error::ReelcapResult;
use serde::{Deserialize, Serialize};

/// Metadata describing one published video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub content_id: String,
    pub owner: String,
    pub public_ref: String,
    pub storage_path: String,
    pub size: u64,
    pub content_type: String,
    pub created_at: String,
}

/// Black-box metadata collaborator: create a record, get back its id.
pub trait MetadataSink: Send + Sync {
    fn create(&self, record: &VideoRecord) -> ReelcapResult<String>;
}

/// Appends one JSON line per record to a log file.
pub struct JsonlMetadataSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMetadataSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl MetadataSink for JsonlMetadataSink {
    fn create(&self, record: &VideoRecord) -> ReelcapResult<String> {
        use std::io::Write;

        let _guard = self.lock.lock().expect("metadata lock poisoned");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(record.content_id.clone())
    }
}
