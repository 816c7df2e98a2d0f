//! Filesystem-backed frame staging.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::SessionId;

/// Prefix of per-session partition directories.
const SESSION_DIR_PREFIX: &str = "session-";

/// Width of the zero-padded frame index in file names. Must match the digit
/// pattern handed to the encoder (`frame-%06d`).
pub const FRAME_INDEX_DIGITS: usize = 6;

/// Disk-backed keyed storage of raw frame artifacts, partitioned by session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> ReelcapResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ReelcapError::storage(format!(
                "Failed to create storage root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session's staged frames.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("{SESSION_DIR_PREFIX}{session}"))
    }

    /// Path of one staged frame.
    pub fn frame_path(&self, session: &SessionId, index: u64) -> PathBuf {
        self.session_dir(session)
            .join(format!("frame-{index:0width$}.raw", width = FRAME_INDEX_DIGITS))
    }

    /// Create the session partition if absent. Idempotent.
    pub fn ensure_session(&self, session: &SessionId) -> ReelcapResult<()> {
        fs::create_dir_all(self.session_dir(session))?;
        Ok(())
    }

    pub fn session_exists(&self, session: &SessionId) -> bool {
        self.session_dir(session).is_dir()
    }

    /// Persist one frame. Overwrites any existing frame at the same index;
    /// a partially-written frame is never visible under the final key.
    pub fn write_frame(&self, session: &SessionId, index: u64, bytes: &[u8]) -> ReelcapResult<()> {
        let final_path = self.frame_path(session, index);
        let tmp_path = final_path.with_extension("raw.tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Read one staged frame fully into memory.
    pub fn read_frame(&self, session: &SessionId, index: u64) -> ReelcapResult<Vec<u8>> {
        let path = self.frame_path(session, index);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReelcapError::FileNotFound { path }
            } else {
                e.into()
            }
        })
    }

    /// Delete one staged frame.
    pub fn remove_frame(&self, session: &SessionId, index: u64) -> ReelcapResult<()> {
        fs::remove_file(self.frame_path(session, index))?;
        Ok(())
    }

    /// Number of staged frames in the partition (0 if it does not exist).
    pub fn frame_count(&self, session: &SessionId) -> ReelcapResult<u64> {
        let dir = self.session_dir(session);
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("frame-") && name.ends_with(".raw") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Lowest index in `[0, total_frames)` with no staged frame, if any.
    pub fn first_missing_index(
        &self,
        session: &SessionId,
        total_frames: u64,
    ) -> ReelcapResult<Option<u64>> {
        for index in 0..total_frames {
            if !self.frame_path(session, index).is_file() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// All sessions currently holding a partition.
    pub fn list_sessions(&self) -> ReelcapResult<Vec<SessionId>> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(raw) = name.to_string_lossy().strip_prefix(SESSION_DIR_PREFIX).map(String::from)
            else {
                continue;
            };
            if let Ok(id) = SessionId::parse(raw) {
                sessions.push(id);
            }
        }
        sessions.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(sessions)
    }

    /// Remove a session partition and everything in it.
    pub fn remove_session(&self, session: &SessionId) -> ReelcapResult<()> {
        let dir = self.session_dir(session);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Time since the newest write in the partition.
    pub fn session_age(&self, session: &SessionId) -> ReelcapResult<Duration> {
        let dir = self.session_dir(session);
        let mut newest = fs::metadata(&dir)?.modified()?;
        for entry in fs::read_dir(&dir)? {
            if let Ok(modified) = entry?.metadata().and_then(|m| m.modified()) {
                if modified > newest {
                    newest = modified;
                }
            }
        }
        Ok(SystemTime::now()
            .duration_since(newest)
            .unwrap_or(Duration::ZERO))
    }

    /// Remove every partition whose newest write is older than `ttl`.
    ///
    /// Abandoned sessions (a client that stopped sending batches) otherwise
    /// leak staging disk forever. Returns the reaped session ids.
    pub fn reap_stale(&self, ttl: Duration) -> ReelcapResult<Vec<SessionId>> {
        let mut reaped = Vec::new();
        for session in self.list_sessions()? {
            let age = match self.session_age(&session) {
                Ok(age) => age,
                Err(e) => {
                    tracing::warn!(session = %session, error = %e, "Failed to stat session partition");
                    continue;
                }
            };
            if age <= ttl {
                continue;
            }
            match self.remove_session(&session) {
                Ok(()) => {
                    tracing::info!(session = %session, age_secs = age.as_secs(), "Reaped stale session");
                    reaped.push(session);
                }
                Err(e) => {
                    tracing::warn!(session = %session, error = %e, "Failed to reap stale session");
                }
            }
        }
        Ok(reaped)
    }
}
