//! Repository layout and configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use merkit_store::fs::write_atomic;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Name of the repository directory inside the working tree.
pub const REPO_DIR: &str = ".merkit";

/// Resolved filesystem paths of a repository.
///
/// Built once from the working-tree root and handed to each backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoLayout {
    pub root: PathBuf,
    pub repo_dir: PathBuf,
    pub objects_dir: PathBuf,
    pub commits_dir: PathBuf,
    pub branches_dir: PathBuf,
    pub index_file: PathBuf,
    pub head_file: PathBuf,
    pub last_commit_file: PathBuf,
    pub config_file: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let repo_dir = root.join(REPO_DIR);
        Self {
            objects_dir: repo_dir.join("objects"),
            commits_dir: repo_dir.join("commits"),
            branches_dir: repo_dir.join("branches"),
            index_file: repo_dir.join("index"),
            head_file: repo_dir.join("HEAD"),
            last_commit_file: repo_dir.join("LAST_COMMIT"),
            config_file: repo_dir.join("config.toml"),
            repo_dir,
            root,
        }
    }

    /// Returns `true` if the repository directory exists.
    pub fn exists(&self) -> bool {
        self.repo_dir.is_dir()
    }

    /// Absolute working-tree path of a normalized, `/`-separated path.
    pub fn work_path(&self, rel: &str) -> PathBuf {
        rel.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

/// Settings persisted in `.merkit/config.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Branch created by `init` and pointed at by HEAD.
    pub default_branch: String,
    /// Recompute a commit's Merkle root before restoring it.
    pub verify_on_checkout: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            verify_on_checkout: true,
        }
    }
}

impl RepoConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> RepoResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> RepoResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RepoError::Config(e.to_string()))?;
        write_atomic(path, content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_live_under_repo_dir() {
        let layout = RepoLayout::new("/work");
        assert_eq!(layout.repo_dir, Path::new("/work/.merkit"));
        assert_eq!(layout.objects_dir, Path::new("/work/.merkit/objects"));
        assert_eq!(layout.head_file, Path::new("/work/.merkit/HEAD"));
        assert_eq!(layout.last_commit_file, Path::new("/work/.merkit/LAST_COMMIT"));
        assert_eq!(layout.work_path("a/b.txt"), Path::new("/work/a/b.txt"));
    }

    #[test]
    fn missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.default_branch, "main");
        assert!(config.verify_on_checkout);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "verify_on_checkout = false\n").unwrap();
        let config = RepoConfig::load(&path).unwrap();
        assert_eq!(config.default_branch, "main");
        assert!(!config.verify_on_checkout);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = RepoConfig {
            default_branch: "trunk".into(),
            verify_on_checkout: false,
        };
        config.save(&path).unwrap();
        assert_eq!(RepoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn garbage_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_branch = [").unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(RepoError::Config(_))));
    }
}
