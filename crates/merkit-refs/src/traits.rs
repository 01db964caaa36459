//! The [`RefStore`] trait defining the reference storage interface.

use merkit_types::CommitId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::types::{Branch, Head};

/// Storage backend for branches and HEAD.
///
/// Implementations must be thread-safe (`Send + Sync`). Branch names are
/// flat strings that may contain `/`; how they map onto storage is up to
/// the backend.
pub trait RefStore: Send + Sync {
    /// Read a branch by name. Returns `Ok(None)` if it does not exist.
    fn read_branch(&self, name: &str) -> Result<Option<Branch>>;

    /// Create or overwrite a branch pointer.
    fn write_branch(&self, branch: &Branch) -> Result<()>;

    /// All branches, sorted by name.
    fn list_branches(&self) -> Result<Vec<Branch>>;

    /// Read the current HEAD state.
    ///
    /// Returns `Ok(None)` if HEAD has not been set.
    fn head(&self) -> Result<Option<Head>>;

    /// Point HEAD at a branch (symbolic).
    fn set_head(&self, branch: &str) -> Result<()>;

    /// Detach HEAD at a commit.
    fn set_head_detached(&self, commit: CommitId) -> Result<()>;

    /// The commit the working tree was last recorded against.
    ///
    /// Set by every commit and when HEAD leaves a branch. Checking out
    /// another commit does not move it.
    fn last_commit(&self) -> Result<Option<CommitId>>;

    fn set_last_commit(&self, commit: CommitId) -> Result<()>;

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read_branch(name)?.is_some())
    }

    /// Read a branch, failing with `NotFound` if it does not exist.
    fn get_branch(&self, name: &str) -> Result<Branch> {
        self.read_branch(name)?.ok_or_else(|| RefError::NotFound {
            name: name.to_string(),
        })
    }

    /// Create a new branch at `at` (or empty), rejecting existing names.
    fn create_branch(&self, name: &str, at: Option<CommitId>) -> Result<Branch> {
        validate_branch_name(name)?;
        if self.branch_exists(name)? {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let branch = Branch {
            name: name.to_string(),
            latest: at,
        };
        self.write_branch(&branch)?;
        debug!(branch = name, latest = ?at, "branch created");
        Ok(branch)
    }

    /// The commit HEAD currently resolves to.
    ///
    /// `None` when HEAD is unset or names a branch with no commits yet.
    fn resolve_head(&self) -> Result<Option<CommitId>> {
        match self.head()? {
            None => Ok(None),
            Some(Head::Detached(id)) => Ok(Some(id)),
            Some(Head::Symbolic(name)) => Ok(self.get_branch(&name)?.latest),
        }
    }

    /// Detach HEAD at `commit`, remembering the tip of the branch being left.
    fn detach_head(&self, commit: CommitId) -> Result<()> {
        if let Some(Head::Symbolic(name)) = self.head()? {
            if let Some(tip) = self.read_branch(&name)?.and_then(|b| b.latest) {
                self.set_last_commit(tip)?;
            }
        }
        self.set_head_detached(commit)
    }

    /// The commit working-tree status is measured against.
    ///
    /// On a branch this is the branch tip. With HEAD detached it is the last
    /// committed commit, falling back to HEAD itself when none was recorded.
    /// A symbolic HEAD naming a missing branch has no baseline.
    fn baseline(&self) -> Result<Option<CommitId>> {
        match self.head()? {
            None => Ok(None),
            Some(Head::Symbolic(name)) => Ok(self.read_branch(&name)?.and_then(|b| b.latest)),
            Some(Head::Detached(id)) => Ok(self.last_commit()?.or(Some(id))),
        }
    }

    /// Record `commit` as the new position of HEAD.
    ///
    /// A symbolic HEAD moves its branch; a detached HEAD moves itself and
    /// leaves every branch untouched.
    fn advance_head(&self, commit: CommitId) -> Result<Head> {
        self.set_last_commit(commit)?;
        match self.head()? {
            Some(Head::Symbolic(name)) => {
                self.write_branch(&Branch::at(name.clone(), commit))?;
                debug!(branch = %name, commit = %commit, "branch advanced");
                Ok(Head::Symbolic(name))
            }
            Some(Head::Detached(_)) | None => {
                self.set_head_detached(commit)?;
                Ok(Head::Detached(commit))
            }
        }
    }
}
