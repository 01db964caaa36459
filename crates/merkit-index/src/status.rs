//! Change-set types.
//!
//! A [`ChangeSet`] is the result of comparing a current path map (the
//! index, or a newer commit) against a baseline (usually the last commit).

use std::collections::BTreeMap;

use merkit_types::Digest;
use serde::{Deserialize, Serialize};

/// Paths that differ between a baseline and a current path map.
///
/// The three lists are disjoint and each is sorted by path. Paths present
/// in both maps with equal digests appear in none of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Present in both, digests differ.
    pub modified: Vec<String>,
    /// Present only in the current map.
    pub new: Vec<String>,
    /// Present only in the baseline.
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes of any kind.
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.new.is_empty() && self.deleted.is_empty()
    }

    /// Total number of changed paths.
    pub fn total_entries(&self) -> usize {
        self.modified.len() + self.new.len() + self.deleted.len()
    }

    /// All changes as path/status pairs, sorted by path.
    pub fn entries(&self) -> Vec<StatusEntry> {
        let mut out: Vec<StatusEntry> = self
            .modified
            .iter()
            .map(|p| StatusEntry::new(p, FileStatus::Modified))
            .chain(self.new.iter().map(|p| StatusEntry::new(p, FileStatus::New)))
            .chain(self.deleted.iter().map(|p| StatusEntry::new(p, FileStatus::Deleted)))
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

/// A single status entry representing a file change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The file path relative to the working tree root.
    pub path: String,
    /// The kind of change.
    pub status: FileStatus,
}

impl StatusEntry {
    /// Create a new status entry.
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}

/// The kind of file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    New,
    Modified,
    Deleted,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Compare `current` against `baseline`, keyed by path.
///
/// Pure: neither map is modified.
pub fn diff_snapshots(
    baseline: &BTreeMap<String, Digest>,
    current: &BTreeMap<String, Digest>,
) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (path, digest) in current {
        match baseline.get(path) {
            Some(old) if old != digest => changes.modified.push(path.clone()),
            Some(_) => {}
            None => changes.new.push(path.clone()),
        }
    }
    for path in baseline.keys() {
        if !current.contains_key(path) {
            changes.deleted.push(path.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(seed: u8) -> Digest {
        Digest::from_hash([seed; 32])
    }

    fn map(entries: &[(&str, u8)]) -> BTreeMap<String, Digest> {
        entries.iter().map(|(p, s)| (p.to_string(), d(*s))).collect()
    }

    #[test]
    fn empty_change_set_is_clean() {
        let changes = ChangeSet::new();
        assert!(changes.is_clean());
        assert_eq!(changes.total_entries(), 0);
    }

    #[test]
    fn classifies_modified_new_deleted() {
        let baseline = map(&[("same", 1), ("changed", 2), ("gone", 3)]);
        let current = map(&[("same", 1), ("changed", 9), ("added", 4)]);
        let changes = diff_snapshots(&baseline, &current);
        assert_eq!(changes.modified, vec!["changed"]);
        assert_eq!(changes.new, vec!["added"]);
        assert_eq!(changes.deleted, vec!["gone"]);
        assert_eq!(changes.total_entries(), 3);
    }

    #[test]
    fn everything_is_new_against_empty_baseline() {
        let changes = diff_snapshots(&BTreeMap::new(), &map(&[("b", 1), ("a", 2)]));
        assert_eq!(changes.new, vec!["a", "b"]);
        assert!(changes.modified.is_empty() && changes.deleted.is_empty());
    }

    #[test]
    fn identical_maps_are_clean() {
        let m = map(&[("a", 1), ("b", 2)]);
        assert!(diff_snapshots(&m, &m).is_clean());
    }

    #[test]
    fn entries_are_sorted_by_path() {
        let changes = diff_snapshots(&map(&[("z", 1), ("m", 2)]), &map(&[("m", 3), ("a", 4)]));
        let entries = changes.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], StatusEntry::new("a", FileStatus::New));
        assert_eq!(entries[1], StatusEntry::new("m", FileStatus::Modified));
        assert_eq!(entries[2], StatusEntry::new("z", FileStatus::Deleted));
    }
}
