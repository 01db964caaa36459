//! Content-addressed object storage and the commit store for merkit.
//!
//! Objects are raw file contents keyed by their SHA-256 digest, analogous
//! to git's `.git/objects/` directory. Commits are immutable records keyed
//! by a random [`CommitId`](merkit_types::CommitId), each carrying the
//! snapshot it recorded and the Merkle root of that snapshot.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] / [`InMemoryCommitStore`] -- `HashMap`-based, for tests and embedding
//! - [`FsObjectStore`] / [`FsCommitStore`] -- one file per object or commit in a directory
//!
//! # Design Rules
//!
//! 1. Objects and commits are immutable once written; neither store offers update or delete.
//! 2. Writing an object that already exists is a no-op.
//! 3. Writing a commit whose id already exists is a fatal `CommitIdCollision`.
//! 4. Files are written to a temporary sibling and renamed into place.
//! 5. All I/O errors are propagated, never retried or silently ignored.

pub mod commit;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use commit::{Commit, SnapshotEntry};
pub use error::{StoreError, StoreResult};
pub use fs::{FsCommitStore, FsObjectStore};
pub use memory::{InMemoryCommitStore, InMemoryObjectStore};
pub use traits::{CommitStore, ObjectStore};
