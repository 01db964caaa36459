//! Repository coordinator for merkit.
//!
//! [`Repository`] ties the object store, commit store, index and refs
//! together behind one explicit handle: staging, commits, checkout, status,
//! commit comparison, integrity checks and inclusion proofs.

pub mod config;
pub mod error;
pub mod report;
pub mod repository;

pub use config::{RepoConfig, RepoLayout, REPO_DIR};
pub use error::{RepoError, RepoResult};
pub use report::{CheckoutReport, CommitComparison, CorruptCommit, FileProof, FsckReport, MissingObject};
pub use repository::Repository;

pub use merkit_index::{ChangeSet, FileStatus, StatusEntry};
pub use merkit_refs::{Branch, Head};
pub use merkit_store::{Commit, SnapshotEntry};
pub use merkit_types::{CommitId, Digest};
