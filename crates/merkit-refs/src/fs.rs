//! Filesystem-backed reference store.
//!
//! ```text
//! branches/<name>.json    {"latest": "<commit id>" | null}
//! HEAD                    branch name or commit id
//! LAST_COMMIT             commit id the working tree was last recorded against
//! ```
//!
//! Branch names containing `/` map to nested directories, so `feature/auth`
//! lives at `branches/feature/auth.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use merkit_store::fs::write_atomic;
use merkit_types::CommitId;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::{Branch, Head};

const BRANCH_EXT: &str = "json";

/// Reference store over a branches directory and a HEAD file.
#[derive(Clone, Debug)]
pub struct FsRefStore {
    branches_dir: PathBuf,
    head_path: PathBuf,
    last_commit_path: PathBuf,
}

impl FsRefStore {
    /// Open a store, creating the branches directory if needed.
    pub fn open(
        branches_dir: impl Into<PathBuf>,
        head_path: impl Into<PathBuf>,
        last_commit_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let branches_dir = branches_dir.into();
        fs::create_dir_all(&branches_dir)?;
        Ok(Self {
            branches_dir,
            head_path: head_path.into(),
            last_commit_path: last_commit_path.into(),
        })
    }

    pub fn branch_path(&self, name: &str) -> PathBuf {
        self.branches_dir.join(format!("{name}.{BRANCH_EXT}"))
    }

    fn name_from_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.branches_dir).ok()?;
        if rel.extension()?.to_str()? != BRANCH_EXT {
            return None;
        }
        let stem = rel.with_extension("");
        let parts: Option<Vec<&str>> = stem.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl RefStore for FsRefStore {
    fn read_branch(&self, name: &str) -> Result<Option<Branch>> {
        if validate_branch_name(name).is_err() {
            return Ok(None);
        }
        let Some(data) = read_optional(&self.branch_path(name))? else {
            return Ok(None);
        };
        let mut branch: Branch =
            serde_json::from_slice(&data).map_err(|e| RefError::Serialization(e.to_string()))?;
        branch.name = name.to_string();
        Ok(Some(branch))
    }

    fn write_branch(&self, branch: &Branch) -> Result<()> {
        validate_branch_name(&branch.name)?;
        let path = self.branch_path(&branch.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(branch).map_err(|e| RefError::Serialization(e.to_string()))?;
        write_atomic(&path, &data)?;
        debug!(branch = %branch.name, latest = ?branch.latest, "branch written");
        Ok(())
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        let mut branches = Vec::new();
        for entry in WalkDir::new(&self.branches_dir).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = self.name_from_path(entry.path()) else {
                continue;
            };
            if let Some(branch) = self.read_branch(&name)? {
                branches.push(branch);
            }
        }
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    /// HEAD is symbolic if it names an existing branch, otherwise it must
    /// parse as a commit id.
    fn head(&self) -> Result<Option<Head>> {
        let Some(data) = read_optional(&self.head_path)? else {
            return Ok(None);
        };
        let scalar = String::from_utf8_lossy(&data).trim().to_string();
        if self.branch_exists(&scalar)? {
            return Ok(Some(Head::Symbolic(scalar)));
        }
        match scalar.parse::<CommitId>() {
            Ok(id) => Ok(Some(Head::Detached(id))),
            Err(_) => Err(RefError::InvalidHead(scalar)),
        }
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        write_atomic(&self.head_path, branch.as_bytes())?;
        debug!(branch, "HEAD set");
        Ok(())
    }

    fn set_head_detached(&self, commit: CommitId) -> Result<()> {
        write_atomic(&self.head_path, commit.to_hex().as_bytes())?;
        debug!(commit = %commit, "HEAD detached");
        Ok(())
    }

    fn last_commit(&self) -> Result<Option<CommitId>> {
        let Some(data) = read_optional(&self.last_commit_path)? else {
            return Ok(None);
        };
        let scalar = String::from_utf8_lossy(&data).trim().to_string();
        scalar
            .parse::<CommitId>()
            .map(Some)
            .map_err(|_| RefError::InvalidHead(scalar))
    }

    fn set_last_commit(&self, commit: CommitId) -> Result<()> {
        write_atomic(&self.last_commit_path, commit.to_hex().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &Path) -> FsRefStore {
        FsRefStore::open(dir.join("branches"), dir.join("HEAD"), dir.join("LAST_COMMIT")).unwrap()
    }

    #[test]
    fn branch_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_branch("main", None).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("branches/main.json")).unwrap()).unwrap();
        assert!(json["latest"].is_null());

        let id = CommitId::from_bytes([7; 10]);
        store.write_branch(&Branch::at("main", id)).unwrap();
        assert_eq!(store.get_branch("main").unwrap().latest, Some(id));
    }

    #[test]
    fn nested_branch_names_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_branch("main", None).unwrap();
        store.create_branch("feature/auth", None).unwrap();
        assert!(dir.path().join("branches/feature/auth.json").is_file());

        let names: Vec<String> = store.list_branches().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["feature/auth", "main"]);
    }

    #[test]
    fn list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_branch("main", None).unwrap();
        fs::write(dir.path().join("branches/README"), b"x").unwrap();
        assert_eq!(store.list_branches().unwrap().len(), 1);
    }

    #[test]
    fn head_unset_then_symbolic() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.head().unwrap().is_none());

        store.create_branch("main", None).unwrap();
        store.set_head("main").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("HEAD")).unwrap(), "main");
        assert_eq!(store.head().unwrap(), Some(Head::Symbolic("main".into())));
    }

    #[test]
    fn head_detached_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let id = CommitId::generate();
        store.set_head_detached(id).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("HEAD")).unwrap(), id.to_hex());
        assert_eq!(store.head().unwrap(), Some(Head::Detached(id)));
    }

    #[test]
    fn head_naming_nothing_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        fs::write(dir.path().join("HEAD"), b"nowhere\n").unwrap();
        assert!(matches!(store.head(), Err(RefError::InvalidHead(s)) if s == "nowhere"));
    }

    #[test]
    fn advance_moves_branch_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_branch("main", None).unwrap();
        store.set_head("main").unwrap();
        let id = CommitId::generate();
        store.advance_head(id).unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.resolve_head().unwrap(), Some(id));
    }

    #[test]
    fn last_commit_survives_reopen_and_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert_eq!(store.last_commit().unwrap(), None);

        store.create_branch("main", None).unwrap();
        store.set_head("main").unwrap();
        let first = CommitId::generate();
        let second = CommitId::generate();
        store.advance_head(first).unwrap();
        store.advance_head(second).unwrap();
        store.detach_head(first).unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.resolve_head().unwrap(), Some(first));
        assert_eq!(reopened.baseline().unwrap(), Some(second));
        assert_eq!(
            fs::read_to_string(dir.path().join("LAST_COMMIT")).unwrap(),
            second.to_hex()
        );
    }
}
