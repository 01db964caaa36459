//! Foundation types for merkit.
//!
//! Every other merkit crate depends on `merkit-types`. The types here are
//! plain values: they know how to parse and print themselves, and nothing
//! about storage or hashing.
//!
//! # Key Types
//!
//! - [`Digest`]: 32-byte content digest, hex-encoded on the wire
//! - [`CommitId`]: randomly generated identifier of a commit record

pub mod commit_id;
pub mod digest;
pub mod error;

pub use commit_id::CommitId;
pub use digest::Digest;
pub use error::TypeError;
