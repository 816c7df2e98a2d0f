//! Reelcap Encode Engine
//!
//! Converts a complete session of staged raw frames into one compressed
//! MP4 via an external `ffmpeg` process. Two frame-feeding strategies are
//! supported, selected at deployment time and yielding the same container
//! and codec guarantees:
//!
//! - **image-sequence**: each raw frame becomes a lossless PNG (raw source
//!   deleted as it goes, bounding peak disk), then one ffmpeg run over the
//!   `frame-%06d.png` pattern;
//! - **concat-manifest**: an ordered manifest of raw frame paths fed to
//!   ffmpeg's concat demuxer with explicit rawvideo input parameters.
//!
//! Either way the invocation fixes H.264, yuv420p, an even-dimension scale
//! filter, and faststart, and the staging partition is released on every
//! exit path.

pub mod ffmpeg;
pub mod finalize;
pub mod frames;

pub use ffmpeg::*;
pub use finalize::*;
