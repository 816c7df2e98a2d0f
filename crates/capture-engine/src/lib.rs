//! Reelcap Capture Engine
//!
//! Drives deterministic per-frame sampling from a time-seekable rendered
//! source and streams the frames to a server in bounded-size batches.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            CaptureOrchestrator               │
//! │  ┌───────────┐  ┌─────────┐  ┌────────────┐  │
//! │  │FrameSource│─▶│ row flip│─▶│  batcher   │  │
//! │  │ (seek/    │  │ (bottom │  │ (N frames  │  │
//! │  │  readback)│  │  -up →  │  │  per flush)│  │
//! │  └───────────┘  │ top-down│  └─────┬──────┘  │
//! │                 └─────────┘        │         │
//! │                                    ▼         │
//! │                         ┌─────────────────┐  │
//! │                         │    BatchSink    │  │
//! │                         │ (HTTP transport)│  │
//! │                         └─────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Sampling is cooperative: each frame suspends at seek completion and at
//! two render-tick boundaries before readback, so no frame is read before
//! the renderer has committed it. Batches are delivered strictly
//! sequentially, bounding peak memory to one batch of frame buffers.

pub mod flip;
pub mod orchestrator;
pub mod source;
pub mod transport;

pub use orchestrator::*;
pub use source::*;
pub use transport::*;
