//! Merkle membership proofs for PoET rounds.
//!
//! A PoET round commits to the list of challenges submitted to it. A smesher
//! proves its challenge was a member of the round by a binary Merkle
//! inclusion proof against the round's member root.

use crate::Hash;
use sbor::prelude::*;

/// Merkle inclusion proof for a leaf in a binary Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq, BasicSbor)]
pub struct MerkleProof {
    /// Index of the leaf in the tree (0-based).
    pub leaf_index: u64,

    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Verify that `leaf_hash` is included in `root` at `leaf_index`.
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        let mut current = *leaf_hash;
        let mut index = self.leaf_index;

        for sibling in &self.siblings {
            current = if index % 2 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            index /= 2;
        }

        current == *root
    }
}

#[inline]
fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    Hash::from_parts(&[left.as_bytes(), right.as_bytes()])
}

/// Compute the member root and the inclusion proof of the leaf at `index`.
///
/// Leaves are padded with zero hashes to the next power of two. Returns
/// `None` if `index` is out of range.
pub fn membership_proof(leaves: &[Hash], index: usize) -> Option<(Hash, MerkleProof)> {
    if index >= leaves.len() {
        return None;
    }

    let mut level: Vec<Hash> = leaves.to_vec();
    level.resize(leaves.len().next_power_of_two(), Hash::ZERO);

    let mut siblings = Vec::new();
    let mut idx = index;
    while level.len() > 1 {
        siblings.push(level[idx ^ 1]);
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
        idx /= 2;
    }

    Some((
        level[0],
        MerkleProof {
            leaf_index: index as u64,
            siblings,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<Hash> {
        (0..n).map(|i| Hash::from_bytes(&[i])).collect()
    }

    #[test]
    fn test_single_leaf() {
        let members = leaves(1);
        let (root, proof) = membership_proof(&members, 0).unwrap();

        assert_eq!(root, members[0]);
        assert!(proof.siblings.is_empty());
        assert!(proof.verify(&members[0], &root));
    }

    #[test]
    fn test_every_leaf_verifies_against_same_root() {
        let members = leaves(5);
        let (root, _) = membership_proof(&members, 0).unwrap();

        for (i, leaf) in members.iter().enumerate() {
            let (r, proof) = membership_proof(&members, i).unwrap();
            assert_eq!(r, root);
            assert_eq!(proof.siblings.len(), 3);
            assert!(proof.verify(leaf, &root), "leaf {} failed", i);
        }
    }

    #[test]
    fn test_proof_rejects_wrong_leaf() {
        let members = leaves(4);
        let (root, proof) = membership_proof(&members, 0).unwrap();

        assert!(!proof.verify(&members[1], &root));
        assert!(!proof.verify(&members[0], &Hash::from_bytes(b"wrong root")));
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(membership_proof(&leaves(3), 3).is_none());
        assert!(membership_proof(&[], 0).is_none());
    }
}
