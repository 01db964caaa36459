use std::path::PathBuf;

use merkit_index::IndexError;
use merkit_refs::RefError;
use merkit_store::StoreError;
use merkit_types::{CommitId, Digest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("not a merkit repository (or any parent): {0}")]
    NotARepository(PathBuf),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("path is outside the working tree: {0}")]
    OutsideWorkTree(PathBuf),

    #[error("nothing to commit: the index is empty")]
    NothingToCommit,

    #[error("commit {commit} is corrupt: recorded root {recorded}, computed {computed}")]
    Corruption {
        commit: CommitId,
        recorded: Digest,
        computed: Digest,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
