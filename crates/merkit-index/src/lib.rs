//! Staging index for merkit.
//!
//! The index is the mutable mapping from path to digest that represents
//! "what will go into the next commit". It is kept in a `BTreeMap`, so its
//! snapshot is always ordered lexicographically by path; that order fixes
//! the Merkle leaf order and makes roots reproducible.
//!
//! # Key Types
//!
//! - [`Index`] -- The staging area (BTreeMap-backed, persisted as JSON)
//! - [`ChangeSet`] -- Modified/new/deleted paths between two path maps
//! - [`FileStatus`] -- Kind of change for a single path

pub mod error;
pub mod index;
pub mod path;
pub mod status;

pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use path::normalize_path;
pub use status::{diff_snapshots, ChangeSet, FileStatus, StatusEntry};
