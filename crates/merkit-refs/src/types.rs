//! Core reference types.

use std::fmt;

use merkit_types::CommitId;
use serde::{Deserialize, Serialize};

/// A branch: a name and the latest commit on it, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(skip)]
    pub name: String,
    /// `None` until the first commit on the branch.
    pub latest: Option<CommitId>,
}

impl Branch {
    /// A branch with no commits yet.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest: None,
        }
    }

    pub fn at(name: impl Into<String>, latest: CommitId) -> Self {
        Self {
            name: name.into(),
            latest: Some(latest),
        }
    }
}

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// HEAD points to a branch by name.
    Symbolic(String),
    /// HEAD is detached, pointing directly to a commit.
    Detached(CommitId),
}

impl Head {
    /// The branch name, if HEAD is symbolic.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Head::Symbolic(name) => Some(name),
            Head::Detached(_) => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached(_))
    }

    /// The persisted scalar form: a branch name or a commit id.
    pub fn to_scalar(&self) -> String {
        match self {
            Head::Symbolic(name) => name.clone(),
            Head::Detached(id) => id.to_hex(),
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Symbolic(name) => write!(f, "{name}"),
            Head::Detached(id) => write!(f, "detached at {}", id.short_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_json_shape() {
        let b = Branch::empty("main");
        assert_eq!(serde_json::to_string(&b).unwrap(), r#"{"latest":null}"#);
        let id = CommitId::from_bytes([0xab; 10]);
        let b = Branch::at("main", id);
        assert_eq!(
            serde_json::to_string(&b).unwrap(),
            r#"{"latest":"abababababababababab"}"#
        );
    }

    #[test]
    fn head_scalar_forms() {
        let id = CommitId::from_bytes([1; 10]);
        assert_eq!(Head::Symbolic("main".into()).to_scalar(), "main");
        assert_eq!(Head::Detached(id).to_scalar(), id.to_hex());
        assert_eq!(Head::Symbolic("dev".into()).branch(), Some("dev"));
        assert!(Head::Detached(id).is_detached());
    }
}
