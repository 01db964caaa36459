//! Filesystem-backed stores.
//!
//! Layout inside the configured directories:
//!
//! ```text
//! objects/<64-hex digest>      raw content
//! commits/<20-hex id>.json     commit record (pretty JSON)
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use merkit_crypto::ContentHasher;
use merkit_types::{CommitId, Digest};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::commit::Commit;
use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitStore, ObjectStore};

/// Write `data` to `path` through a temporary sibling file and a rename, so
/// readers never observe a partially written file.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Object store keeping one file per digest in a directory.
///
/// Reads re-hash the content and fail with `HashMismatch` if the file no
/// longer matches its name.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    dir: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that holds `digest`.
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        self.dir.join(digest.to_hex())
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, content: &[u8]) -> StoreResult<Digest> {
        let digest = ContentHasher::hash(content);
        let path = self.object_path(&digest);
        if path.exists() {
            debug!(digest = %digest.short_hex(), "object already stored");
            return Ok(digest);
        }
        write_atomic(&path, content)?;
        debug!(digest = %digest.short_hex(), len = content.len(), "object written");
        Ok(digest)
    }

    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let Some(data) = read_optional(&self.object_path(digest))? else {
            return Ok(None);
        };
        let computed = ContentHasher::hash(&data);
        if computed != *digest {
            return Err(StoreError::HashMismatch {
                expected: *digest,
                computed,
            });
        }
        Ok(Some(data))
    }

    fn has(&self, digest: &Digest) -> StoreResult<bool> {
        Ok(self.object_path(digest).is_file())
    }
}

/// Commit store keeping one JSON file per commit in a directory.
#[derive(Clone, Debug)]
pub struct FsCommitStore {
    dir: PathBuf,
}

impl FsCommitStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn commit_path(&self, id: &CommitId) -> PathBuf {
        self.dir.join(format!("{}.json", id.to_hex()))
    }
}

impl CommitStore for FsCommitStore {
    fn read_commit(&self, id: &CommitId) -> StoreResult<Option<Commit>> {
        let Some(data) = read_optional(&self.commit_path(id))? else {
            return Ok(None);
        };
        let commit: Commit =
            serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(commit))
    }

    fn write_commit(&self, commit: &Commit) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(commit)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let path = self.commit_path(&commit.id);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        // Never replace an existing record: a reused id is an integrity failure.
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::CommitIdCollision(commit.id)
            } else {
                StoreError::Io(e.error)
            }
        })?;
        debug!(commit = %commit.id, files = commit.snapshot.len(), "commit written");
        Ok(())
    }

    fn contains(&self, id: &CommitId) -> StoreResult<bool> {
        Ok(self.commit_path(id).is_file())
    }

    fn list(&self) -> StoreResult<Vec<CommitId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<CommitId>() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
