use merkit_types::Digest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hasher::ContentHasher;

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Errors from Merkle tree construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree with no leaves")]
    EmptyTree,
}

/// Binary Merkle tree over an ordered sequence of leaf digests.
///
/// Leaves are digests (already hashed once), not raw content. Each level
/// pairs adjacent nodes left to right; a trailing odd node is paired with
/// itself. Internal nodes are `hash(hex(left) ++ hex(right))` with no
/// leaf/internal domain separation, so a single-leaf tree's root is the
/// leaf itself.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// All tree nodes stored level by level.
    /// Level 0 = leaves, last level = `[root]`.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a Merkle tree from leaf digests, in the given order.
    pub fn from_leaves(leaves: Vec<Digest>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut levels: Vec<Vec<Digest>> = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => ContentHasher::hash_pair(left, right),
                    // Odd node: hash with itself
                    [only] => ContentHasher::hash_pair(only, only),
                    _ => unreachable!("chunks(2) yields one or two elements"),
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// The root hash of the tree.
    pub fn root(&self) -> Digest {
        self.levels[self.levels.len() - 1][0]
    }

    /// The leaf digests, in tree order.
    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels including the leaf level and the root level.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// Position of the first leaf equal to `leaf`.
    pub fn position(&self, leaf: &Digest) -> Option<usize> {
        self.levels[0].iter().position(|l| l == leaf)
    }

    /// Returns `true` if `leaf` occurs more than once among the leaves.
    ///
    /// Proof lookup by value resolves such a leaf to its first occurrence.
    pub fn is_ambiguous(&self, leaf: &Digest) -> bool {
        self.levels[0].iter().filter(|l| *l == leaf).count() > 1
    }

    /// Generate an inclusion proof for raw content.
    ///
    /// The content is hashed once to match the stored leaves. Returns `None`
    /// when no leaf matches.
    pub fn proof(&self, content: &[u8]) -> Option<MerkleProof> {
        self.proof_for_leaf(&ContentHasher::hash(content))
    }

    /// Generate an inclusion proof for a leaf digest.
    pub fn proof_for_leaf(&self, leaf: &Digest) -> Option<MerkleProof> {
        let index = self.position(leaf)?;
        if self.is_ambiguous(leaf) {
            debug!(leaf = %leaf.short_hex(), index, "leaf occurs more than once; proving first occurrence");
        }
        self.proof_at(index)
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof_at(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 0 {
                // Odd level: the last node is its own sibling
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                ProofStep::new(*sibling, Side::Right)
            } else {
                ProofStep::new(level[idx - 1], Side::Left)
            };
            path.push(step);
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.levels[0][index],
            path,
        })
    }
}

/// One level of an inclusion proof: a sibling digest and which side it sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

impl ProofStep {
    pub fn new(sibling: Digest, side: Side) -> Self {
        Self { sibling, side }
    }
}

/// Merkle inclusion proof.
///
/// Holds one step per tree level below the root, ordered from the leaf
/// level upward. A proof for a single-leaf tree is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Digest,
    /// Sibling steps from leaf to root.
    pub path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Sibling digests in order, without their sides.
    pub fn siblings(&self) -> Vec<Digest> {
        self.path.iter().map(|step| step.sibling).collect()
    }

    /// Fold the path starting from `leaf`, returning the implied root.
    pub fn compute_root(&self) -> Digest {
        fold_path(self.leaf, &self.path)
    }

    /// Verify that `content` hashes to this proof's leaf and that the path
    /// leads to `root`.
    pub fn verify(&self, content: &[u8], root: &Digest) -> bool {
        ContentHasher::hash(content) == self.leaf && self.compute_root() == *root
    }
}

/// Verify that `content` is included under `root` via `path`.
///
/// Recomputes `hash(content)` and folds the path left to right, pairing
/// with each sibling on its recorded side. Never panics: a path of the
/// wrong length or with altered siblings simply yields `false`.
pub fn verify(content: &[u8], path: &[ProofStep], root: &Digest) -> bool {
    fold_path(ContentHasher::hash(content), path) == *root
}

fn fold_path(leaf: Digest, path: &[ProofStep]) -> Digest {
    path.iter().fold(leaf, |current, step| match step.side {
        Side::Left => ContentHasher::hash_pair(&step.sibling, &current),
        Side::Right => ContentHasher::hash_pair(&current, &step.sibling),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn h(data: &[u8]) -> Digest {
        ContentHasher::hash(data)
    }

    fn tree_of(contents: &[&[u8]]) -> MerkleTree {
        MerkleTree::from_leaves(contents.iter().map(|c| h(c)).collect()).unwrap()
    }

    #[test]
    fn empty_tree_is_rejected() {
        assert_eq!(MerkleTree::from_leaves(vec![]).unwrap_err(), MerkleError::EmptyTree);
    }

    #[test]
    fn single_leaf_is_root() {
        let tree = tree_of(&[b"hello"]);
        assert_eq!(tree.root(), h(b"hello"));
        assert_eq!(
            tree.root().to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn single_leaf_proof_is_empty_and_verifies() {
        let tree = tree_of(&[b"only"]);
        let proof = tree.proof(b"only").unwrap();
        assert!(proof.path.is_empty());
        assert!(verify(b"only", &proof.path, &tree.root()));
    }

    #[test]
    fn two_leaves_hash_hex_concatenation() {
        let tree = tree_of(&[b"hello", b"world"]);
        let expected = h(format!("{}{}", h(b"hello"), h(b"world")).as_bytes());
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn odd_level_duplicates_last_node() {
        let (a, b, c) = (h(b"a"), h(b"b"), h(b"c"));
        let tree = MerkleTree::from_leaves(vec![a, b, c]).unwrap();
        let level1 = &tree.levels()[1];
        assert_eq!(level1, &vec![ContentHasher::hash_pair(&a, &b), ContentHasher::hash_pair(&c, &c)]);
        assert_eq!(tree.root(), ContentHasher::hash_pair(&level1[0], &level1[1]));
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn self_paired_leaf_proof_uses_itself_as_sibling() {
        let tree = tree_of(&[b"a", b"b", b"c"]);
        let proof = tree.proof(b"c").unwrap();
        assert_eq!(proof.path[0], ProofStep::new(h(b"c"), Side::Right));
        assert!(proof.verify(b"c", &tree.root()));
    }

    #[test]
    fn proof_verifies_for_all_leaves() {
        let contents: Vec<Vec<u8>> = (0..7u8).map(|i| vec![i; 3]).collect();
        let tree = MerkleTree::from_leaves(contents.iter().map(|c| h(c)).collect()).unwrap();
        for content in &contents {
            let proof = tree.proof(content).expect("proof should exist");
            assert_eq!(proof.path.len(), tree.depth() - 1);
            assert!(verify(content, &proof.path, &tree.root()));
        }
    }

    #[test]
    fn right_child_needs_left_pairing() {
        let tree = tree_of(&[b"left", b"right"]);
        let proof = tree.proof(b"right").unwrap();
        assert_eq!(proof.path[0].side, Side::Left);
        // Folding as if the sibling were on the right must not verify.
        let flipped: Vec<ProofStep> =
            proof.path.iter().map(|s| ProofStep::new(s.sibling, Side::Right)).collect();
        assert!(!verify(b"right", &flipped, &tree.root()));
        assert!(verify(b"right", &proof.path, &tree.root()));
    }

    #[test]
    fn missing_leaf_is_not_found() {
        let tree = tree_of(&[b"a", b"b"]);
        assert!(tree.proof(b"zzz").is_none());
        assert!(tree.proof_at(2).is_none());
    }

    #[test]
    fn tampered_sibling_fails_verification() {
        let tree = tree_of(&[b"1", b"2", b"3", b"4"]);
        let mut proof = tree.proof(b"1").unwrap();
        proof.path[1].sibling = h(b"forged");
        assert!(!verify(b"1", &proof.path, &tree.root()));
    }

    #[test]
    fn wrong_length_proof_returns_false() {
        let tree = tree_of(&[b"1", b"2", b"3", b"4"]);
        let proof = tree.proof(b"1").unwrap();
        assert!(!verify(b"1", &proof.path[..1], &tree.root()));
        let mut longer = proof.path.clone();
        longer.push(ProofStep::new(h(b"x"), Side::Right));
        assert!(!verify(b"1", &longer, &tree.root()));
    }

    #[test]
    fn duplicate_leaf_resolves_to_first_occurrence() {
        let tree = tree_of(&[b"dup", b"other", b"dup"]);
        assert!(tree.is_ambiguous(&h(b"dup")));
        assert!(!tree.is_ambiguous(&h(b"other")));
        let proof = tree.proof(b"dup").unwrap();
        assert_eq!(proof, tree.proof_at(0).unwrap());
        assert!(proof.verify(b"dup", &tree.root()));
    }

    #[test]
    fn power_of_two_leaves() {
        let leaves: Vec<Digest> = (0..8u8).map(|i| h(&[i])).collect();
        let tree = MerkleTree::from_leaves(leaves).unwrap();
        for i in 0..8 {
            let proof = tree.proof_at(i).unwrap();
            assert_eq!(proof.path.len(), 3);
            assert_eq!(proof.compute_root(), tree.root());
        }
    }

    #[test]
    fn proof_serde_roundtrip() {
        let tree = tree_of(&[b"1", b"2", b"3"]);
        let proof = tree.proof(b"2").unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        let parsed: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(proof, parsed);
        assert!(parsed.verify(b"2", &tree.root()));
    }

    fn distinct_contents() -> impl Strategy<Value = Vec<Vec<u8>>> {
        proptest::collection::btree_set(proptest::collection::vec(any::<u8>(), 0..16), 1..24)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #[test]
        fn root_is_deterministic(contents in distinct_contents()) {
            let leaves: Vec<Digest> = contents.iter().map(|c| h(c)).collect();
            let a = MerkleTree::from_leaves(leaves.clone()).unwrap();
            let b = MerkleTree::from_leaves(leaves).unwrap();
            prop_assert_eq!(a.root(), b.root());
        }

        #[test]
        fn every_leaf_has_a_verifying_proof(contents in distinct_contents()) {
            let tree = MerkleTree::from_leaves(contents.iter().map(|c| h(c)).collect()).unwrap();
            for content in &contents {
                let proof = tree.proof(content).unwrap();
                prop_assert!(verify(content, &proof.path, &tree.root()));
            }
        }

        #[test]
        fn absent_content_has_no_proof(contents in distinct_contents(), probe in proptest::collection::vec(any::<u8>(), 0..16)) {
            prop_assume!(!contents.contains(&probe));
            let tree = MerkleTree::from_leaves(contents.iter().map(|c| h(c)).collect()).unwrap();
            prop_assert!(tree.proof(&probe).is_none());
        }

        #[test]
        fn swapping_two_leaves_changes_root(contents in distinct_contents(), i in any::<usize>(), j in any::<usize>()) {
            prop_assume!(contents.len() >= 2);
            let (i, j) = (i % contents.len(), j % contents.len());
            prop_assume!(i != j);
            let leaves: Vec<Digest> = contents.iter().map(|c| h(c)).collect();
            let mut swapped = leaves.clone();
            swapped.swap(i, j);
            let a = MerkleTree::from_leaves(leaves).unwrap();
            let b = MerkleTree::from_leaves(swapped).unwrap();
            prop_assert_ne!(a.root(), b.root());
        }

        #[test]
        fn tampering_any_sibling_breaks_proof(contents in distinct_contents(), pick in any::<usize>(), step in any::<usize>()) {
            prop_assume!(contents.len() >= 2);
            let tree = MerkleTree::from_leaves(contents.iter().map(|c| h(c)).collect()).unwrap();
            let content = &contents[pick % contents.len()];
            let mut proof = tree.proof(content).unwrap();
            let s = step % proof.path.len();
            proof.path[s].sibling = h(b"tampered-sibling");
            prop_assert!(!verify(content, &proof.path, &tree.root()));
        }
    }
}
