//! Error types shared across Reelcap crates.

use std::path::PathBuf;

/// Top-level error type for Reelcap operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelcapError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Missing staged frame {index}")]
    MissingFrame { index: u64 },

    #[error("Encoding failed: {message}")]
    Encoding { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelcapError.
pub type ReelcapResult<T> = Result<T, ReelcapError>;

impl ReelcapError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn missing_frame(index: u64) -> Self {
        Self::MissingFrame { index }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }
}
