use merkit_types::Digest;
use sha2::{Digest as _, Sha256};

/// SHA-256 content hasher.
///
/// Deterministic and total: every byte sequence has a digest, and hashing
/// the same bytes twice yields the same digest. There is no domain tag, so
/// the digest of a file's content is exactly `sha256(content)`.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> Digest {
        Digest::from_hash(Sha256::digest(data).into())
    }

    /// Hash the concatenation of two digests' hex forms.
    ///
    /// This is the internal-node rule of the Merkle tree: the parent of
    /// `(left, right)` is `sha256(hex(left) ++ hex(right))`.
    pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(left.to_hex().as_bytes());
        hasher.update(right.to_hex().as_bytes());
        Digest::from_hash(hasher.finalize().into())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(data: &[u8], expected: &Digest) -> bool {
        Self::hash(data) == *expected
    }
}
