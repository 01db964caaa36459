//! Result types returned by repository operations.

use std::fmt;

use merkit_crypto::MerkleProof;
use merkit_types::{CommitId, Digest};
use serde::{Deserialize, Serialize};

/// A snapshot entry whose object could not be read back intact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingObject {
    pub path: String,
    pub digest: Digest,
}

/// Outcome of restoring a commit into the working tree.
///
/// Checkout is not atomic across files: every entry whose object is present
/// is written even when others are missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReport {
    pub commit: CommitId,
    pub restored: Vec<String>,
    pub missing: Vec<MissingObject>,
}

impl CheckoutReport {
    /// Returns `true` if every file of the commit was restored.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Result of comparing two commits by Merkle root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitComparison {
    Equal,
    Differ,
}

impl CommitComparison {
    pub fn from_roots(a: &Digest, b: &Digest) -> Self {
        if a == b {
            Self::Equal
        } else {
            Self::Differ
        }
    }

    pub fn is_equal(self) -> bool {
        self == Self::Equal
    }
}

impl fmt::Display for CommitComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Differ => write!(f, "differ"),
        }
    }
}

/// A commit whose recorded root does not match its snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptCommit {
    pub commit: CommitId,
    pub recorded: Digest,
    /// `None` when no root can be computed (an empty snapshot).
    pub computed: Option<Digest>,
}

/// Findings of a full repository integrity check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsckReport {
    pub commits_checked: usize,
    pub corrupt_commits: Vec<CorruptCommit>,
    /// Commit ids referenced by a branch, HEAD or a parent link but absent.
    pub missing_commits: Vec<CommitId>,
    pub missing_objects: Vec<MissingObject>,
    /// Objects present on disk whose content no longer matches their digest.
    pub damaged_objects: Vec<MissingObject>,
}

impl FsckReport {
    pub fn is_clean(&self) -> bool {
        self.corrupt_commits.is_empty()
            && self.missing_commits.is_empty()
            && self.missing_objects.is_empty()
            && self.damaged_objects.is_empty()
    }
}

/// Inclusion proof of a working-tree file against a commit's Merkle root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProof {
    pub commit: CommitId,
    pub path: String,
    pub root: Digest,
    pub proof: MerkleProof,
}

impl FileProof {
    /// Check `content` against the root captured with the proof.
    pub fn verify(&self, content: &[u8]) -> bool {
        self.proof.verify(content, &self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_from_roots() {
        let a = Digest::from_hash([1; 32]);
        let b = Digest::from_hash([2; 32]);
        assert!(CommitComparison::from_roots(&a, &a).is_equal());
        assert_eq!(CommitComparison::from_roots(&a, &b), CommitComparison::Differ);
        assert_eq!(CommitComparison::Differ.to_string(), "differ");
    }

    #[test]
    fn empty_fsck_report_is_clean() {
        let mut report = FsckReport::default();
        assert!(report.is_clean());
        report.missing_commits.push(CommitId::from_bytes([0; 10]));
        assert!(!report.is_clean());
    }
}
