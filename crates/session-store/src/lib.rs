//! Reelcap Session Store
//!
//! Durable-enough staging of raw frame artifacts between upload and encode.
//! Frames are plain files under an injected storage root, partitioned by
//! session id:
//!
//! ```text
//! <root>/session-<id>/frame-000000.raw
//! <root>/session-<id>/frame-000001.raw
//! ...
//! ```
//!
//! The store owns create/read/delete for one session's artifacts; there is
//! no ambient global path state. [`StagingGuard`] scopes a session partition
//! to a finalize attempt and releases it on every exit path.

pub mod guard;
pub mod store;

pub use guard::*;
pub use store::*;
