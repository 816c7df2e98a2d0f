//! Session identity and lifecycle.

use reelcap_common::error::{ReelcapError, ReelcapResult};
use serde::{Deserialize, Serialize};

use crate::geometry::FrameGeometry;

/// Maximum accepted session id length.
const MAX_SESSION_ID_LEN: usize = 64;

/// Opaque, caller-generated session identifier.
///
/// The id names a storage partition on the server, so the accepted alphabet
/// is restricted to `[A-Za-z0-9_-]` — anything that could traverse or split
/// a path is rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: impl Into<String>) -> ReelcapResult<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > MAX_SESSION_ID_LEN {
            return Err(ReelcapError::validation(format!(
                "Session id must be 1..={MAX_SESSION_ID_LEN} characters"
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ReelcapError::validation(format!(
                "Session id {raw:?} contains characters outside [A-Za-z0-9_-]"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw).map_err(|e| e.to_string())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Lifecycle state of a capture session.
///
/// `Collecting → Finalizing → {Complete, Failed}`; terminal states absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Accepting frame batches.
    Collecting,
    /// A finalize is in flight.
    Finalizing,
    /// Finalize succeeded; the staging partition is gone.
    Complete,
    /// Finalize failed; the staging partition is gone.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether a batch write is legal in this state.
    pub fn accepts_batches(self) -> bool {
        matches!(self, Self::Collecting)
    }

    /// Whether a finalize call is legal in this state.
    pub fn accepts_finalize(self) -> bool {
        matches!(self, Self::Collecting | Self::Finalizing)
    }
}

/// Finalize request body: convert every staged frame of a session into one
/// compressed video artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub total_frames: u64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl FinalizeRequest {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    /// Expected playback duration of the finalized video.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / self.fps.max(1) as f64
    }

    pub fn validate(&self) -> ReelcapResult<()> {
        self.geometry().validate()?;
        if self.total_frames == 0 {
            return Err(ReelcapError::validation(
                "Finalize requires at least one frame",
            ));
        }
        if self.fps == 0 {
            return Err(ReelcapError::validation("Finalize requires a non-zero fps"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_accepts_opaque_tokens() {
        assert!(SessionId::parse("abc123").is_ok());
        assert!(SessionId::parse("1733452800123").is_ok());
        assert!(SessionId::parse("a-b_C9").is_ok());
    }

    #[test]
    fn session_id_rejects_path_separators() {
        assert!(SessionId::parse("../etc").is_err());
        assert!(SessionId::parse("a/b").is_err());
        assert!(SessionId::parse("a\\b").is_err());
        assert!(SessionId::parse("a b").is_err());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("x".repeat(65)).is_err());
    }

    #[test]
    fn state_machine_terminals_absorb() {
        assert!(SessionState::Collecting.accepts_batches());
        assert!(SessionState::Collecting.accepts_finalize());
        assert!(SessionState::Finalizing.accepts_finalize());
        assert!(!SessionState::Finalizing.accepts_batches());
        for terminal in [SessionState::Complete, SessionState::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.accepts_batches());
            assert!(!terminal.accepts_finalize());
        }
    }

    #[test]
    fn finalize_request_validation() {
        let request = FinalizeRequest {
            total_frames: 60,
            fps: 30,
            width: 640,
            height: 480,
        };
        assert!(request.validate().is_ok());
        assert!((request.duration_secs() - 2.0).abs() < 1e-9);

        let zero_frames = FinalizeRequest {
            total_frames: 0,
            ..request.clone()
        };
        assert!(zero_frames.validate().is_err());

        let zero_fps = FinalizeRequest { fps: 0, ..request };
        assert!(zero_fps.validate().is_err());
    }
}
