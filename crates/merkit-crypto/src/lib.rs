//! Hashing and Merkle trees for merkit.
//!
//! Provides the SHA-256 content hasher that keys every stored object, and a
//! binary Merkle tree over ordered digest sequences with inclusion proofs.
//!
//! All crypto operations wrap established libraries; no custom primitives.

pub mod hasher;
pub mod merkle;

pub use hasher::ContentHasher;
pub use merkle::{verify as verify_proof, MerkleError, MerkleProof, MerkleTree, ProofStep, Side};
