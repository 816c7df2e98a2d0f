//! In-memory session lifecycle tracking and per-session serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{BatchHeader, FrameGeometry, SessionId, SessionState};

struct SessionEntry {
    state: SessionState,
    geometry: Option<FrameGeometry>,
    last_start_frame: Option<u64>,
    /// Serializes batch staging and finalize for this session. Storage is
    /// partitioned by session id, so distinct sessions never contend.
    op_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            state: SessionState::Collecting,
            geometry: None,
            last_start_frame: None,
            op_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Tracks every session's state machine and hands out its operation lock.
///
/// Terminal entries are retained so that repeated finalize calls on a
/// completed session keep getting the same deterministic rejection.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one batch: create the session on first contact, enforce the
    /// state machine, geometry consistency, and non-decreasing start-frame
    /// order. Returns the session's operation lock on success.
    pub fn admit_batch(
        &self,
        header: &BatchHeader,
    ) -> ReelcapResult<Arc<tokio::sync::Mutex<()>>> {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        let entry = sessions
            .entry(header.session_id.clone())
            .or_insert_with(SessionEntry::new);

        if !entry.state.accepts_batches() {
            return Err(ReelcapError::session(format!(
                "Session {} is {:?} and no longer accepts batches",
                header.session_id, entry.state
            )));
        }

        match entry.geometry {
            Some(geometry) if geometry != header.geometry => {
                return Err(ReelcapError::validation(format!(
                    "Session {} geometry changed from {} to {}",
                    header.session_id, geometry, header.geometry
                )));
            }
            Some(_) => {}
            None => entry.geometry = Some(header.geometry),
        }

        if let Some(last) = entry.last_start_frame {
            if header.start_frame < last {
                return Err(ReelcapError::validation(format!(
                    "Batch start frame went backwards: {} after {last}",
                    header.start_frame
                )));
            }
        }
        entry.last_start_frame = Some(header.start_frame);

        Ok(Arc::clone(&entry.op_lock))
    }

    /// Admit a finalize: legal only from Collecting/Finalizing. Terminal
    /// sessions are rejected deterministically — the encoder never runs
    /// twice for one session.
    pub fn admit_finalize(
        &self,
        session: &SessionId,
    ) -> ReelcapResult<Arc<tokio::sync::Mutex<()>>> {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        let entry = sessions
            .entry(session.clone())
            .or_insert_with(SessionEntry::new);

        if !entry.state.accepts_finalize() {
            return Err(ReelcapError::session(format!(
                "Session {session} is already {:?}; finalize is not repeatable",
                entry.state
            )));
        }

        entry.state = SessionState::Finalizing;
        Ok(Arc::clone(&entry.op_lock))
    }

    /// Re-check a batch admission after its operation lock was acquired.
    ///
    /// Admission happens before the lock wait; a finalize that slipped in
    /// meanwhile may have consumed the session, and staging into a released
    /// partition would resurrect it as an orphan.
    pub fn confirm_batch(&self, session: &SessionId) -> ReelcapResult<()> {
        let sessions = self.sessions.lock().expect("registry lock poisoned");
        match sessions.get(session) {
            Some(entry) if entry.state.accepts_batches() => Ok(()),
            Some(entry) => Err(ReelcapError::session(format!(
                "Session {session} became {:?} while the batch waited",
                entry.state
            ))),
            None => Err(ReelcapError::session(format!("Unknown session {session}"))),
        }
    }

    /// Re-check a finalize admission after its operation lock was acquired.
    /// If a concurrent finalize won the lock and resolved the session, this
    /// attempt is rejected and the encoder is never invoked again.
    pub fn confirm_finalize(&self, session: &SessionId) -> ReelcapResult<()> {
        let sessions = self.sessions.lock().expect("registry lock poisoned");
        match sessions.get(session) {
            Some(entry) if entry.state == SessionState::Finalizing => Ok(()),
            Some(entry) => Err(ReelcapError::session(format!(
                "Session {session} is already {:?}; finalize is not repeatable",
                entry.state
            ))),
            None => Err(ReelcapError::session(format!("Unknown session {session}"))),
        }
    }

    /// Record the terminal outcome of a finalize attempt. Terminal states
    /// absorb: an already-resolved session is never overwritten.
    pub fn resolve_finalize(&self, session: &SessionId, success: bool) {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        if let Some(entry) = sessions.get_mut(session) {
            if entry.state == SessionState::Finalizing {
                entry.state = if success {
                    SessionState::Complete
                } else {
                    SessionState::Failed
                };
            }
        }
    }

    pub fn state_of(&self, session: &SessionId) -> Option<SessionState> {
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .get(session)
            .map(|entry| entry.state)
    }
}
