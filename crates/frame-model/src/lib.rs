//! Reelcap Data Model
//!
//! Types shared by every pipeline stage: session identifiers and lifecycle
//! state, frame geometry, batch headers, and the encoded artifact returned
//! by finalize. Nothing here touches disk or the network; the model crate
//! only encodes the shapes and invariants the other crates agree on.

pub mod artifact;
pub mod batch;
pub mod geometry;
pub mod session;

pub use artifact::*;
pub use batch::*;
pub use geometry::*;
pub use session::*;
