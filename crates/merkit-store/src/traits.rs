use merkit_types::{CommitId, Digest};

use crate::commit::Commit;
use crate::error::{StoreError, StoreResult};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same content always produces
///   the same digest, so re-writing it is a no-op.
/// - There is no update or delete operation.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store content and return its digest.
    ///
    /// If the object already exists, nothing is written (idempotent).
    fn put(&self, content: &[u8]) -> StoreResult<Digest>;

    /// Read an object by digest.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether an object exists in the store.
    fn has(&self, digest: &Digest) -> StoreResult<bool>;

    /// Read an object, treating absence as `ObjectNotFound`.
    fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        self.read(digest)?
            .ok_or(StoreError::ObjectNotFound(*digest))
    }

    /// Store several objects and return their digests in order.
    fn put_batch(&self, contents: &[&[u8]]) -> StoreResult<Vec<Digest>> {
        contents.iter().map(|c| self.put(c)).collect()
    }
}

/// Append-only store of commit records.
///
/// Commits are never mutated after being written. Writing a commit whose id
/// is already present fails with `CommitIdCollision`.
pub trait CommitStore: Send + Sync {
    /// Read a commit by id. Returns `Ok(None)` if it does not exist.
    fn read_commit(&self, id: &CommitId) -> StoreResult<Option<Commit>>;

    /// Persist a new commit.
    fn write_commit(&self, commit: &Commit) -> StoreResult<()>;

    /// Check whether a commit exists.
    fn contains(&self, id: &CommitId) -> StoreResult<bool>;

    /// All stored commit ids, sorted.
    fn list(&self) -> StoreResult<Vec<CommitId>>;

    /// Read a commit, treating absence as `CommitNotFound`.
    fn get_commit(&self, id: &CommitId) -> StoreResult<Commit> {
        self.read_commit(id)?
            .ok_or(StoreError::CommitNotFound(*id))
    }

    /// Walk parent links starting at `start`, newest first, up to `limit`
    /// commits.
    fn history(&self, start: &CommitId, limit: usize) -> StoreResult<Vec<Commit>> {
        let mut out = Vec::new();
        let mut next = Some(*start);
        while let Some(id) = next {
            if out.len() >= limit {
                break;
            }
            let commit = self.get_commit(&id)?;
            next = commit.parent;
            out.push(commit);
        }
        Ok(out)
    }
}
