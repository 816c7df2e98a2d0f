//! Reelcap Session Stager
//!
//! Receives frame batches, validates their shape, and persists each frame
//! into the session store. The stager performs no cross-batch completeness
//! check — that is the finalizer's job.

pub mod stage;

pub use stage::*;
