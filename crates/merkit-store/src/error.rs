use merkit_crypto::MerkleError;
use merkit_types::{CommitId, Digest};

/// Errors from object and commit store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    ObjectNotFound(Digest),

    /// The requested commit was not found.
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// A commit with this id already exists. Ids must never be reused.
    #[error("commit id collision: {0} already exists")]
    CommitIdCollision(CommitId),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {expected}: stored content hashes to {computed}")]
    HashMismatch { expected: Digest, computed: Digest },

    /// A snapshot could not be turned into a Merkle tree.
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
