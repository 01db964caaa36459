use std::collections::HashMap;
use std::sync::RwLock;

use merkit_crypto::ContentHasher;
use merkit_types::{CommitId, Digest};

use crate::commit::Commit;
use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitStore, ObjectStore};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Content is cloned on read and write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, content: &[u8]) -> StoreResult<Digest> {
        let digest = ContentHasher::hash(content);
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(digest).or_insert_with(|| content.to_vec());
        Ok(digest)
    }

    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(digest).cloned())
    }

    fn has(&self, digest: &Digest) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(digest))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

/// In-memory commit store.
#[derive(Debug, Default)]
pub struct InMemoryCommitStore {
    commits: RwLock<HashMap<CommitId, Commit>>,
}

impl InMemoryCommitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commits.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommitStore for InMemoryCommitStore {
    fn read_commit(&self, id: &CommitId) -> StoreResult<Option<Commit>> {
        let map = self.commits.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn write_commit(&self, commit: &Commit) -> StoreResult<()> {
        let mut map = self.commits.write().expect("lock poisoned");
        if map.contains_key(&commit.id) {
            return Err(StoreError::CommitIdCollision(commit.id));
        }
        map.insert(commit.id, commit.clone());
        Ok(())
    }

    fn contains(&self, id: &CommitId) -> StoreResult<bool> {
        let map = self.commits.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn list(&self) -> StoreResult<Vec<CommitId>> {
        let map = self.commits.read().expect("lock poisoned");
        let mut ids: Vec<CommitId> = map.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
