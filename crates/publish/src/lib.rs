//! Reelcap Publish & Delivery
//!
//! Takes finalize output and (a) persists it to durable object storage
//! under a per-owner path, (b) materializes it locally for the caller.
//! The two actions are independent: a failed publish never suppresses
//! delivery, and vice versa.
//!
//! Object storage is abstracted behind a minimal store/delete contract;
//! the shipped backend is filesystem-based. Metadata records are consumed
//! as a black box through [`MetadataSink`].

pub mod metadata;
pub mod publisher;
pub mod store;

pub use metadata::*;
pub use publisher::*;
pub use store::*;
