//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps branches in a `BTreeMap` protected by a
//! `RwLock`. Data is lost when the store is dropped.

use std::collections::BTreeMap;
use std::sync::RwLock;

use merkit_types::CommitId;

use crate::error::Result;
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::{Branch, Head};

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    branches: RwLock<BTreeMap<String, Option<CommitId>>>,
    head: RwLock<Option<Head>>,
    last_commit: RwLock<Option<CommitId>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_branch(&self, name: &str) -> Result<Option<Branch>> {
        let branches = self.branches.read().expect("lock poisoned");
        Ok(branches.get(name).map(|latest| Branch {
            name: name.to_string(),
            latest: *latest,
        }))
    }

    fn write_branch(&self, branch: &Branch) -> Result<()> {
        validate_branch_name(&branch.name)?;
        let mut branches = self.branches.write().expect("lock poisoned");
        branches.insert(branch.name.clone(), branch.latest);
        Ok(())
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        let branches = self.branches.read().expect("lock poisoned");
        Ok(branches
            .iter()
            .map(|(name, latest)| Branch {
                name: name.clone(),
                latest: *latest,
            })
            .collect())
    }

    fn head(&self) -> Result<Option<Head>> {
        Ok(self.head.read().expect("lock poisoned").clone())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        *self.head.write().expect("lock poisoned") = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, commit: CommitId) -> Result<()> {
        *self.head.write().expect("lock poisoned") = Some(Head::Detached(commit));
        Ok(())
    }

    fn last_commit(&self) -> Result<Option<CommitId>> {
        Ok(*self.last_commit.read().expect("lock poisoned"))
    }

    fn set_last_commit(&self, commit: CommitId) -> Result<()> {
        *self.last_commit.write().expect("lock poisoned") = Some(commit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefError;

    fn id(seed: u8) -> CommitId {
        CommitId::from_bytes([seed; 10])
    }

    #[test]
    fn create_and_read_branch() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", None).unwrap();
        let read = store.read_branch("main").unwrap().unwrap();
        assert_eq!(read, Branch::empty("main"));
        assert!(store.read_branch("nope").unwrap().is_none());
    }

    #[test]
    fn create_existing_branch_fails() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", None).unwrap();
        let err = store.create_branch("main", Some(id(1))).unwrap_err();
        assert!(matches!(err, RefError::AlreadyExists { name } if name == "main"));
        assert_eq!(store.get_branch("main").unwrap().latest, None);
    }

    #[test]
    fn invalid_branch_name_is_rejected() {
        let store = InMemoryRefStore::new();
        assert!(matches!(
            store.write_branch(&Branch::empty("bad..name")),
            Err(RefError::InvalidBranchName { .. })
        ));
        assert!(store.set_head("has space").is_err());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = InMemoryRefStore::new();
        for name in ["zeta", "alpha", "feature/x"] {
            store.create_branch(name, None).unwrap();
        }
        let names: Vec<String> = store.list_branches().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["alpha", "feature/x", "zeta"]);
    }

    #[test]
    fn unset_head_resolves_to_nothing() {
        let store = InMemoryRefStore::new();
        assert!(store.head().unwrap().is_none());
        assert_eq!(store.resolve_head().unwrap(), None);
    }

    #[test]
    fn symbolic_head_resolves_through_branch() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", None).unwrap();
        store.set_head("main").unwrap();
        assert_eq!(store.resolve_head().unwrap(), None);

        store.advance_head(id(1)).unwrap();
        assert_eq!(store.resolve_head().unwrap(), Some(id(1)));
        assert_eq!(store.get_branch("main").unwrap().latest, Some(id(1)));
        assert_eq!(store.head().unwrap(), Some(Head::Symbolic("main".into())));
    }

    #[test]
    fn symbolic_head_to_missing_branch_is_not_found() {
        let store = InMemoryRefStore::new();
        store.set_head("ghost").unwrap();
        assert!(matches!(store.resolve_head(), Err(RefError::NotFound { .. })));
    }

    #[test]
    fn detached_advance_leaves_branches_alone() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", Some(id(1))).unwrap();
        store.set_head_detached(id(1)).unwrap();

        let head = store.advance_head(id(2)).unwrap();
        assert_eq!(head, Head::Detached(id(2)));
        assert_eq!(store.resolve_head().unwrap(), Some(id(2)));
        assert_eq!(store.get_branch("main").unwrap().latest, Some(id(1)));
    }

    #[test]
    fn detaching_keeps_the_branch_tip_as_baseline() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", None).unwrap();
        store.set_head("main").unwrap();
        store.advance_head(id(1)).unwrap();
        store.advance_head(id(2)).unwrap();
        assert_eq!(store.baseline().unwrap(), Some(id(2)));

        store.detach_head(id(1)).unwrap();
        assert_eq!(store.resolve_head().unwrap(), Some(id(1)));
        assert_eq!(store.baseline().unwrap(), Some(id(2)));
        assert_eq!(store.last_commit().unwrap(), Some(id(2)));

        store.detach_head(id(2)).unwrap();
        store.detach_head(id(1)).unwrap();
        assert_eq!(store.baseline().unwrap(), Some(id(2)));
    }

    #[test]
    fn detached_commit_becomes_baseline() {
        let store = InMemoryRefStore::new();
        store.create_branch("main", Some(id(1))).unwrap();
        store.set_head("main").unwrap();
        store.detach_head(id(1)).unwrap();
        store.advance_head(id(3)).unwrap();
        assert_eq!(store.baseline().unwrap(), Some(id(3)));
        assert_eq!(store.get_branch("main").unwrap().latest, Some(id(1)));
    }

    #[test]
    fn baseline_of_missing_branch_is_none() {
        let store = InMemoryRefStore::new();
        store.set_head("ghost").unwrap();
        assert_eq!(store.baseline().unwrap(), None);

        let bare = InMemoryRefStore::new();
        bare.set_head_detached(id(4)).unwrap();
        assert_eq!(bare.baseline().unwrap(), Some(id(4)));
    }
}
