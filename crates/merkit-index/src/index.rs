//! The core Index structure managing staged entries.
//!
//! The [`Index`] manages a `BTreeMap<String, Digest>` as the staging area.
//! Reading files from the working tree is the caller's job; the index only
//! stores content it is handed and records the resulting digest.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use merkit_store::fs::write_atomic;
use merkit_store::{ObjectStore, SnapshotEntry};
use merkit_types::Digest;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::path::normalize_path;
use crate::status::{diff_snapshots, ChangeSet};

/// The staging index: one digest per tracked path.
///
/// The `store` receives file content when a file is staged, so every digest
/// in the index refers to an object that was present when it was added.
pub struct Index {
    /// All tracked entries, keyed by normalized path.
    entries: BTreeMap<String, Digest>,
    /// The object store for writing staged content.
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Index {
    /// Create a new empty index backed by the given store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            entries: BTreeMap::new(),
            store,
        }
    }

    /// Load an index from its JSON file (`{"path": "digest", ...}`).
    ///
    /// A missing file is an empty index.
    pub fn load(path: &Path, store: Arc<dyn ObjectStore>) -> IndexResult<Self> {
        let entries = match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|e| IndexError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { entries, store })
    }

    /// Persist the index as pretty JSON, replacing the file atomically.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        let data = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        write_atomic(path, &data)?;
        debug!(entries = self.entries.len(), "index saved");
        Ok(())
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest staged for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.entries.get(path)
    }

    /// The entries as a path-keyed map.
    pub fn entries(&self) -> &BTreeMap<String, Digest> {
        &self.entries
    }

    // ---------------------------------------------------------------
    // Stage operations
    // ---------------------------------------------------------------

    /// Upsert the entry for `path`.
    ///
    /// Adds a new path or overwrites an existing path's digest. Returns the
    /// previous digest, if the path was already tracked.
    pub fn set(&mut self, path: &str, digest: Digest) -> IndexResult<Option<Digest>> {
        let key = normalize_path(path)?;
        debug!(path = %key, digest = %digest.short_hex(), "index entry set");
        Ok(self.entries.insert(key, digest))
    }

    /// Stage file content: write it to the object store and record its digest.
    pub fn stage_file(&mut self, path: &str, content: &[u8]) -> IndexResult<Digest> {
        let key = normalize_path(path)?;
        let digest = self.store.put(content)?;
        self.set(&key, digest)?;
        Ok(digest)
    }

    /// Remove an entry from the index entirely.
    pub fn remove(&mut self, path: &str) -> IndexResult<Digest> {
        let key = normalize_path(path)?;
        self.entries
            .remove(&key)
            .ok_or(IndexError::PathNotFound(key))
    }

    // ---------------------------------------------------------------
    // Snapshot / status
    // ---------------------------------------------------------------

    /// Materialize the entries in lexicographic path order.
    ///
    /// This order is the Merkle leaf order of the next commit.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        self.entries
            .iter()
            .map(|(path, digest)| SnapshotEntry::new(path.clone(), *digest))
            .collect()
    }

    /// Compare the index against a committed path map.
    pub fn status_against(&self, baseline: &BTreeMap<String, Digest>) -> ChangeSet {
        diff_snapshots(baseline, &self.entries)
    }
}
