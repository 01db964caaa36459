use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use merkit_index::{diff_snapshots, normalize_path, ChangeSet, Index};
use merkit_refs::{validate_branch_name, Branch, FsRefStore, Head, RefStore};
use merkit_store::fs::write_atomic;
use merkit_store::{
    Commit, CommitStore, FsCommitStore, FsObjectStore, ObjectStore, SnapshotEntry, StoreError,
};
use merkit_types::{CommitId, Digest};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{RepoConfig, RepoLayout, REPO_DIR};
use crate::error::{RepoError, RepoResult};
use crate::report::{
    CheckoutReport, CommitComparison, CorruptCommit, FileProof, FsckReport, MissingObject,
};

/// Handle to a merkit repository.
///
/// Every operation goes through an explicit handle; nothing is cached
/// between calls except the layout, the config and the backends. The index
/// is read from disk at the start of each operation that needs it.
pub struct Repository {
    layout: RepoLayout,
    config: RepoConfig,
    objects: Arc<dyn ObjectStore>,
    commits: Arc<dyn CommitStore>,
    refs: Arc<dyn RefStore>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.layout.root)
            .field("config", &self.config)
            .finish()
    }
}

impl Repository {
    /// Initialize a repository at `root` with the default config.
    pub fn init(root: impl AsRef<Path>) -> RepoResult<Self> {
        Self::init_with_config(root, RepoConfig::default())
    }

    pub fn init_with_config(root: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        validate_branch_name(&config.default_branch)?;
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let layout = RepoLayout::new(fs::canonicalize(root)?);
        if layout.exists() {
            return Err(RepoError::AlreadyInitialized(layout.repo_dir));
        }
        fs::create_dir_all(&layout.repo_dir)?;
        config.save(&layout.config_file)?;

        let repo = Self::from_layout(layout, config)?;
        Index::new(repo.objects.clone()).save(&repo.layout.index_file)?;
        repo.refs.create_branch(&repo.config.default_branch, None)?;
        repo.refs.set_head(&repo.config.default_branch)?;
        info!(
            root = %repo.layout.root.display(),
            branch = %repo.config.default_branch,
            "repository initialized"
        );
        Ok(repo)
    }

    /// Open the repository whose working tree is rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> RepoResult<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|_| RepoError::NotARepository(root.to_path_buf()))?;
        let layout = RepoLayout::new(root);
        if !layout.exists() {
            return Err(RepoError::NotARepository(layout.root));
        }
        let config = RepoConfig::load(&layout.config_file)?;
        Self::from_layout(layout, config)
    }

    /// Open the nearest repository at or above `start`.
    pub fn discover(start: impl AsRef<Path>) -> RepoResult<Self> {
        let start = start.as_ref();
        let start = fs::canonicalize(start).map_err(|_| RepoError::NotARepository(start.to_path_buf()))?;
        for dir in start.ancestors() {
            if dir.join(REPO_DIR).is_dir() {
                debug!(root = %dir.display(), "repository discovered");
                return Self::open(dir);
            }
        }
        Err(RepoError::NotARepository(start))
    }

    /// Assemble a repository from explicit backends.
    ///
    /// The working tree and the index file still live under `layout`.
    pub fn with_backends(
        layout: RepoLayout,
        config: RepoConfig,
        objects: Arc<dyn ObjectStore>,
        commits: Arc<dyn CommitStore>,
        refs: Arc<dyn RefStore>,
    ) -> Self {
        Self {
            layout,
            config,
            objects,
            commits,
            refs,
        }
    }

    fn from_layout(layout: RepoLayout, config: RepoConfig) -> RepoResult<Self> {
        let objects = FsObjectStore::open(layout.objects_dir.clone())?;
        let commits = FsCommitStore::open(layout.commits_dir.clone())?;
        let refs = FsRefStore::open(
            layout.branches_dir.clone(),
            layout.head_file.clone(),
            layout.last_commit_file.clone(),
        )?;
        Ok(Self::with_backends(
            layout,
            config,
            Arc::new(objects),
            Arc::new(commits),
            Arc::new(refs),
        ))
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    fn load_index(&self) -> RepoResult<Index> {
        Ok(Index::load(&self.layout.index_file, self.objects.clone())?)
    }

    // ---- Staging ----

    /// Stage a file, or every regular file under a directory.
    ///
    /// Relative paths are resolved against the working-tree root. The
    /// repository directory itself is never staged.
    pub fn add(&self, path: impl AsRef<Path>) -> RepoResult<Vec<SnapshotEntry>> {
        let target = self.resolve(path.as_ref())?;
        let mut index = self.load_index()?;
        let mut staged = Vec::new();

        if target.is_dir() {
            let repo_dir = self.layout.repo_dir.clone();
            let walker = WalkDir::new(&target)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |e| e.path() != repo_dir.as_path());
            for entry in walker {
                let entry = entry.map_err(io::Error::from)?;
                if entry.file_type().is_file() {
                    staged.push(self.stage(&mut index, entry.path())?);
                }
            }
        } else {
            staged.push(self.stage(&mut index, &target)?);
        }

        index.save(&self.layout.index_file)?;
        info!(files = staged.len(), "staged");
        Ok(staged)
    }

    fn resolve(&self, path: &Path) -> RepoResult<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.layout.root.join(path)
        };
        let canonical = match fs::canonicalize(&joined) {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::PathNotFound(joined))
            }
            Err(e) => return Err(e.into()),
        };
        if !canonical.starts_with(&self.layout.root) || canonical.starts_with(&self.layout.repo_dir) {
            return Err(RepoError::OutsideWorkTree(canonical));
        }
        Ok(canonical)
    }

    fn stage(&self, index: &mut Index, abs: &Path) -> RepoResult<SnapshotEntry> {
        let rel = abs
            .strip_prefix(&self.layout.root)
            .map_err(|_| RepoError::OutsideWorkTree(abs.to_path_buf()))?;
        let key = normalize_path(&rel.to_string_lossy())?;
        let content = fs::read(abs)?;
        let digest = index.stage_file(&key, &content)?;
        Ok(SnapshotEntry::new(key, digest))
    }

    /// Drop `path` from the index. The working-tree file is left alone.
    pub fn remove(&self, path: &str) -> RepoResult<Digest> {
        let mut index = self.load_index()?;
        let digest = index.remove(path)?;
        index.save(&self.layout.index_file)?;
        info!(path, "unstaged");
        Ok(digest)
    }

    // ---- Commits ----

    /// Record the index as a new commit and move HEAD to it.
    pub fn commit(&self, message: &str) -> RepoResult<Commit> {
        let index = self.load_index()?;
        if index.is_empty() {
            return Err(RepoError::NothingToCommit);
        }
        let parent = self.refs.resolve_head()?;
        let commit = Commit::build(
            CommitId::generate(),
            parent,
            message,
            Utc::now().timestamp_millis(),
            index.snapshot(),
        )?;
        self.commits.write_commit(&commit)?;
        let head = self.refs.advance_head(commit.id)?;
        info!(
            commit = %commit.id,
            head = %head,
            files = commit.snapshot.len(),
            root = %commit.merkle_root.short_hex(),
            "committed"
        );
        Ok(commit)
    }

    pub fn show(&self, id: &CommitId) -> RepoResult<Commit> {
        Ok(self.commits.get_commit(id)?)
    }

    /// Up to `limit` commits reachable from HEAD, newest first.
    pub fn log(&self, limit: usize) -> RepoResult<Vec<Commit>> {
        match self.refs.resolve_head()? {
            Some(id) => Ok(self.commits.history(&id, limit)?),
            None => Ok(Vec::new()),
        }
    }

    /// Recompute a commit's Merkle root; `Corruption` if it differs.
    pub fn verify_commit(&self, id: &CommitId) -> RepoResult<Commit> {
        let commit = self.commits.get_commit(id)?;
        check_root(&commit)?;
        Ok(commit)
    }

    // ---- Working tree ----

    /// Restore a commit's files and detach HEAD at it.
    ///
    /// The index is not touched, and neither is the last committed commit
    /// that [`status`](Self::status) compares against. Files whose objects are missing are listed
    /// in the report while the rest are still written.
    pub fn checkout(&self, id: &CommitId) -> RepoResult<CheckoutReport> {
        let commit = self.commits.get_commit(id)?;
        let report = self.restore(&commit)?;
        self.refs.detach_head(commit.id)?;
        info!(
            commit = %commit.id,
            restored = report.restored.len(),
            missing = report.missing.len(),
            "checked out"
        );
        Ok(report)
    }

    fn restore(&self, commit: &Commit) -> RepoResult<CheckoutReport> {
        if self.config.verify_on_checkout {
            check_root(commit)?;
        }
        let mut keys = Vec::with_capacity(commit.snapshot.len());
        for entry in &commit.snapshot {
            let key = normalize_path(&entry.file_path)?;
            if key.split('/').next() == Some(REPO_DIR) {
                warn!(commit = %commit.id, path = %key, "snapshot entry points into the repository directory");
                return Err(RepoError::OutsideWorkTree(self.layout.work_path(&key)));
            }
            keys.push(key);
        }

        let mut report = CheckoutReport {
            commit: commit.id,
            restored: Vec::new(),
            missing: Vec::new(),
        };
        for (entry, key) in commit.snapshot.iter().zip(keys) {
            let content = match self.objects.read(&entry.hash) {
                Ok(Some(content)) => content,
                Ok(None) | Err(StoreError::HashMismatch { .. }) => {
                    warn!(path = %key, digest = %entry.hash.short_hex(), "object missing, file not restored");
                    report.missing.push(MissingObject {
                        path: key,
                        digest: entry.hash,
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let dest = self.layout.work_path(&key);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            write_atomic(&dest, &content)?;
            report.restored.push(key);
        }
        Ok(report)
    }

    /// Compare the index against the last committed snapshot.
    ///
    /// On a branch that is the branch tip. After a checkout it is still the
    /// commit that was current before HEAD was detached. A tip whose commit
    /// record is gone counts as an empty snapshot.
    pub fn status(&self) -> RepoResult<ChangeSet> {
        let baseline = match self.refs.baseline()? {
            Some(id) => match self.commits.read_commit(&id)? {
                Some(commit) => commit.files(),
                None => {
                    warn!(commit = %id, "baseline commit is missing, comparing against an empty snapshot");
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };
        Ok(self.load_index()?.status_against(&baseline))
    }

    // ---- Comparison ----

    /// Compare two commits by Merkle root alone.
    pub fn compare_commits(&self, a: &CommitId, b: &CommitId) -> RepoResult<CommitComparison> {
        let a = self.commits.get_commit(a)?;
        let b = self.commits.get_commit(b)?;
        Ok(CommitComparison::from_roots(&a.merkle_root, &b.merkle_root))
    }

    /// Path-level changes going from `a` to `b`.
    pub fn diff_commits(&self, a: &CommitId, b: &CommitId) -> RepoResult<ChangeSet> {
        let a = self.commits.get_commit(a)?;
        let b = self.commits.get_commit(b)?;
        Ok(diff_snapshots(&a.files(), &b.files()))
    }

    // ---- Integrity ----

    /// Walk every commit reachable from a branch or a detached HEAD.
    ///
    /// Content problems go into the report; only I/O and decoding failures
    /// are returned as errors.
    pub fn fsck(&self) -> RepoResult<FsckReport> {
        let mut tips: Vec<CommitId> = self
            .refs
            .list_branches()?
            .into_iter()
            .filter_map(|b| b.latest)
            .collect();
        if let Some(Head::Detached(id)) = self.refs.head()? {
            tips.push(id);
        }

        let mut report = FsckReport::default();
        let mut visited = HashSet::new();
        let mut object_health = HashMap::new();
        let mut checked_entries = HashSet::new();
        for tip in tips {
            let mut next = Some(tip);
            while let Some(id) = next {
                if !visited.insert(id) {
                    break;
                }
                let Some(commit) = self.commits.read_commit(&id)? else {
                    warn!(commit = %id, "referenced commit is missing");
                    report.missing_commits.push(id);
                    break;
                };
                report.commits_checked += 1;

                let computed = commit.recompute_root().ok();
                if computed != Some(commit.merkle_root) {
                    warn!(commit = %id, "merkle root mismatch");
                    report.corrupt_commits.push(CorruptCommit {
                        commit: id,
                        recorded: commit.merkle_root,
                        computed,
                    });
                }
                for entry in &commit.snapshot {
                    if !checked_entries.insert((entry.file_path.clone(), entry.hash)) {
                        continue;
                    }
                    let health = match object_health.get(&entry.hash) {
                        Some(health) => *health,
                        None => {
                            let health = self.object_health(&entry.hash)?;
                            object_health.insert(entry.hash, health);
                            health
                        }
                    };
                    let problem = MissingObject {
                        path: entry.file_path.clone(),
                        digest: entry.hash,
                    };
                    match health {
                        ObjectHealth::Intact => {}
                        ObjectHealth::Missing => report.missing_objects.push(problem),
                        ObjectHealth::Damaged => report.damaged_objects.push(problem),
                    }
                }
                next = commit.parent;
            }
        }
        info!(
            commits = report.commits_checked,
            clean = report.is_clean(),
            "fsck finished"
        );
        Ok(report)
    }

    fn object_health(&self, digest: &Digest) -> RepoResult<ObjectHealth> {
        match self.objects.read(digest) {
            Ok(Some(_)) => Ok(ObjectHealth::Intact),
            Ok(None) => Ok(ObjectHealth::Missing),
            Err(StoreError::HashMismatch { .. }) => Ok(ObjectHealth::Damaged),
            Err(e) => Err(e.into()),
        }
    }

    /// Prove that the working-tree file at `path` is a leaf of a commit.
    ///
    /// `None` if the file's current content is not part of that commit.
    pub fn prove_file(&self, id: &CommitId, path: &str) -> RepoResult<Option<FileProof>> {
        let commit = self.commits.get_commit(id)?;
        let key = normalize_path(path)?;
        let file = self.layout.work_path(&key);
        let content = match fs::read(&file) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(RepoError::PathNotFound(file)),
            Err(e) => return Err(e.into()),
        };
        Ok(commit.prove(&content)?.map(|proof| FileProof {
            commit: commit.id,
            path: key,
            root: commit.merkle_root,
            proof,
        }))
    }

    /// Check a proof against the current working-tree file and the root
    /// recorded in the commit store.
    ///
    /// A missing file verifies as `false`.
    pub fn verify_file_proof(&self, proof: &FileProof) -> RepoResult<bool> {
        let commit = self.commits.get_commit(&proof.commit)?;
        let content = match fs::read(self.layout.work_path(&proof.path)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(proof.proof.verify(&content, &commit.merkle_root))
    }

    // ---- Branches ----

    /// Create a branch at the commit HEAD resolves to.
    pub fn create_branch(&self, name: &str) -> RepoResult<Branch> {
        let at = self.refs.resolve_head()?;
        Ok(self.refs.create_branch(name, at)?)
    }

    /// Restore the branch tip (if any) and point HEAD at the branch.
    pub fn switch_branch(&self, name: &str) -> RepoResult<Option<CheckoutReport>> {
        let branch = self.refs.get_branch(name)?;
        let report = match branch.latest {
            Some(id) => Some(self.restore(&self.commits.get_commit(&id)?)?),
            None => None,
        };
        self.refs.set_head(name)?;
        info!(branch = name, "switched branch");
        Ok(report)
    }

    pub fn list_branches(&self) -> RepoResult<Vec<Branch>> {
        Ok(self.refs.list_branches()?)
    }

    pub fn head(&self) -> RepoResult<Option<Head>> {
        Ok(self.refs.head()?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ObjectHealth {
    Intact,
    Missing,
    Damaged,
}

fn check_root(commit: &Commit) -> RepoResult<()> {
    let computed = commit.recompute_root()?;
    if computed != commit.merkle_root {
        warn!(commit = %commit.id, "merkle root mismatch");
        return Err(RepoError::Corruption {
            commit: commit.id,
            recorded: commit.merkle_root,
            computed,
        });
    }
    Ok(())
}
