//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory for staged frame partitions.
    pub storage_root: PathBuf,

    /// Default capture settings.
    pub capture: CaptureDefaults,

    /// External encoder settings.
    pub encoder: EncoderConfig,

    /// Publish / object storage settings.
    pub publish: PublishConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDefaults {
    /// Sampling frame rate.
    pub fps: u32,

    /// Frames accumulated per upload batch.
    pub batch_size: u32,
}

/// How the finalizer feeds staged frames to the external encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodeStrategy {
    /// Convert each raw frame to a lossless PNG, then encode the sequence.
    ImageSequence,
    /// Feed raw frames directly through a concat manifest.
    ConcatManifest,
}

/// External encoder (ffmpeg) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Explicit path to the ffmpeg binary. `FFMPEG_PATH` in the environment
    /// takes precedence; `ffmpeg` on PATH is the fallback.
    pub ffmpeg_path: Option<PathBuf>,

    /// Frame-feeding strategy, selected at deployment time.
    pub strategy: EncodeStrategy,

    /// x264 preset.
    pub preset: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Bitrate ceiling in kbps.
    pub video_bitrate_kbps: u32,

    /// Wall-clock limit for one encoder invocation, in seconds.
    pub timeout_secs: u64,
}

/// Publish / delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Root directory of the filesystem-backed object store.
    pub object_root: PathBuf,

    /// Base URL prepended to stored object paths to form public references.
    pub public_base_url: String,

    /// Append-only metadata record log.
    pub metadata_log: PathBuf,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8787".
    pub listen_addr: String,

    /// Maximum accepted batch payload size in bytes.
    pub max_batch_bytes: usize,

    /// Sessions with no activity for this long are reaped.
    pub session_ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelcap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: dirs_default_state().join("staging"),
            capture: CaptureDefaults::default(),
            encoder: EncoderConfig::default(),
            publish: PublishConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            batch_size: 30,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            strategy: EncodeStrategy::ImageSequence,
            preset: "medium".to_string(),
            crf: 23,
            video_bitrate_kbps: 5000,
            timeout_secs: 600,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            object_root: dirs_default_state().join("objects"),
            public_base_url: "http://localhost:8787/objects".to_string(),
            metadata_log: dirs_default_state().join("content.jsonl"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            max_batch_bytes: 512 * 1024 * 1024,
            session_ttl_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelcap").join("config.json")
}

/// Default state directory for staging and object storage.
fn dirs_default_state() -> PathBuf {
    let base = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("state")
        });
    base.join("reelcap")
}
