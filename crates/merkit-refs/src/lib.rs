//! Branch pointers and HEAD for merkit.
//!
//! - **Branches** are named, mutable pointers to the latest commit on a line
//!   of history. A freshly initialized branch points at nothing.
//! - **HEAD** names the current branch (symbolic) or a raw commit id
//!   (detached). It is persisted as a single scalar.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: [`Branch`] and [`Head`]
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Branch name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`] for tests
//! - [`fs`]: [`FsRefStore`], one JSON file per branch plus a `HEAD` file

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::validate_branch_name;
pub use traits::RefStore;
pub use types::{Branch, Head};
