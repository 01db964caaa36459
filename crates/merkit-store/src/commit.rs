use std::collections::BTreeMap;

use merkit_crypto::{MerkleProof, MerkleTree};
use merkit_types::{CommitId, Digest};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// One tracked file in a commit snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    /// Repository-relative path, `/`-separated.
    pub file_path: String,
    /// Digest of the file's content in the object store.
    pub hash: Digest,
}

impl SnapshotEntry {
    pub fn new(file_path: impl Into<String>, hash: Digest) -> Self {
        Self {
            file_path: file_path.into(),
            hash,
        }
    }
}

/// Immutable commit record.
///
/// `merkle_root` is the root of the Merkle tree built over the snapshot's
/// digests in snapshot order. That equality is what ties a commit's
/// identity to its content; [`Commit::verify_root`] re-checks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: CommitId,
    /// Previous commit on the same line of history; `None` for the first.
    pub parent: Option<CommitId>,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "files")]
    pub snapshot: Vec<SnapshotEntry>,
    pub merkle_root: Digest,
}

impl Commit {
    /// Build a commit over `snapshot`, computing its Merkle root.
    ///
    /// Fails with `StoreError::Merkle` if the snapshot is empty.
    pub fn build(
        id: CommitId,
        parent: Option<CommitId>,
        message: impl Into<String>,
        timestamp: i64,
        snapshot: Vec<SnapshotEntry>,
    ) -> StoreResult<Self> {
        let merkle_root = merkle_tree(&snapshot)?.root();
        Ok(Self {
            id,
            parent,
            message: message.into(),
            timestamp,
            snapshot,
            merkle_root,
        })
    }

    /// Rebuild the Merkle tree from the recorded snapshot.
    pub fn tree(&self) -> StoreResult<MerkleTree> {
        merkle_tree(&self.snapshot)
    }

    /// Recompute the Merkle root from the recorded snapshot.
    pub fn recompute_root(&self) -> StoreResult<Digest> {
        Ok(self.tree()?.root())
    }

    /// Returns `true` if the recorded root matches the snapshot.
    ///
    /// An empty snapshot (which `build` never produces) does not verify.
    pub fn verify_root(&self) -> bool {
        self.recompute_root()
            .map(|root| root == self.merkle_root)
            .unwrap_or(false)
    }

    /// The snapshot's leaf digests in order.
    pub fn digests(&self) -> Vec<Digest> {
        self.snapshot.iter().map(|e| e.hash).collect()
    }

    /// The snapshot as a path-keyed map.
    pub fn files(&self) -> BTreeMap<String, Digest> {
        self.snapshot
            .iter()
            .map(|e| (e.file_path.clone(), e.hash))
            .collect()
    }

    /// Digest recorded for `path`, if tracked by this commit.
    pub fn digest_of(&self, path: &str) -> Option<Digest> {
        self.snapshot
            .iter()
            .find(|e| e.file_path == path)
            .map(|e| e.hash)
    }

    /// Inclusion proof for raw content against this commit's tree.
    pub fn prove(&self, content: &[u8]) -> StoreResult<Option<MerkleProof>> {
        Ok(self.tree()?.proof(content))
    }
}

fn merkle_tree(snapshot: &[SnapshotEntry]) -> StoreResult<MerkleTree> {
    let leaves = snapshot.iter().map(|e| e.hash).collect();
    Ok(MerkleTree::from_leaves(leaves)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use merkit_crypto::{ContentHasher, MerkleError};

    fn entry(path: &str, content: &[u8]) -> SnapshotEntry {
        SnapshotEntry::new(path, ContentHasher::hash(content))
    }

    #[test]
    fn single_file_root_is_its_digest() {
        let c = Commit::build(CommitId::generate(), None, "first", 0, vec![entry("a.txt", b"hello")])
            .unwrap();
        assert_eq!(c.merkle_root, ContentHasher::hash(b"hello"));
        assert!(c.verify_root());
    }

    #[test]
    fn two_file_root_pairs_in_snapshot_order() {
        let c = Commit::build(
            CommitId::generate(),
            None,
            "second",
            0,
            vec![entry("a.txt", b"hello"), entry("b.txt", b"world")],
        )
        .unwrap();
        let expected = ContentHasher::hash_pair(&ContentHasher::hash(b"hello"), &ContentHasher::hash(b"world"));
        assert_eq!(c.merkle_root, expected);
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let err = Commit::build(CommitId::generate(), None, "empty", 0, vec![]).unwrap_err();
        assert!(matches!(err, StoreError::Merkle(MerkleError::EmptyTree)));
    }

    #[test]
    fn tampered_snapshot_fails_root_check() {
        let mut c = Commit::build(CommitId::generate(), None, "m", 0, vec![entry("a", b"1"), entry("b", b"2")])
            .unwrap();
        c.snapshot[1].hash = ContentHasher::hash(b"3");
        assert!(!c.verify_root());
    }

    #[test]
    fn lookup_helpers() {
        let c = Commit::build(CommitId::generate(), None, "m", 0, vec![entry("a", b"1"), entry("b", b"2")])
            .unwrap();
        assert_eq!(c.digest_of("b"), Some(ContentHasher::hash(b"2")));
        assert_eq!(c.digest_of("zzz"), None);
        assert_eq!(c.files().len(), 2);
        assert_eq!(c.digests(), vec![ContentHasher::hash(b"1"), ContentHasher::hash(b"2")]);
    }

    #[test]
    fn prove_content_against_commit() {
        let c = Commit::build(CommitId::generate(), None, "m", 0, vec![entry("a", b"1"), entry("b", b"2")])
            .unwrap();
        let proof = c.prove(b"2").unwrap().expect("content is a leaf");
        assert!(proof.verify(b"2", &c.merkle_root));
        assert!(c.prove(b"absent").unwrap().is_none());
    }

    #[test]
    fn json_shape_uses_camel_case_fields() {
        let c = Commit::build(CommitId::from_bytes([1; 10]), None, "m", 42, vec![entry("a", b"1")]).unwrap();
        let value = serde_json::to_value(&c).unwrap();
        assert!(value.get("merkleRoot").is_some());
        assert!(value["parent"].is_null());
        assert_eq!(value["files"][0]["filePath"], "a");
        let back: Commit = serde_json::from_value(value).unwrap();
        assert_eq!(back, c);
    }
}
