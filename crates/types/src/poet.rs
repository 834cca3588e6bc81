//! Proof-of-Elapsed-Time (PoET) service types.

use crate::Hash;
use std::time::SystemTime;

/// Reference to a PoET proof; the PoST of a cycle is executed against it.
pub type PoetProofRef = Hash;

/// A PoET round a challenge was submitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetRound {
    /// Round identifier assigned by the service.
    pub id: String,
    /// When the round ends and its proof becomes available.
    pub end: SystemTime,
}

/// Persisted record of a successful submission to one PoET service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetRegistration {
    /// Address of the service.
    pub address: String,
    /// Hash of the challenge that was submitted.
    pub challenge_hash: Hash,
    /// Round the challenge was registered in.
    pub round_id: String,
    /// End of that round.
    pub round_end: SystemTime,
}

/// A PoET proof for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetProof {
    /// Round the proof was generated for.
    pub round_id: String,
    /// Merkle root over the round's members.
    pub members_root: Hash,
    /// Number of sequential work leaves (the proof's tick count).
    pub leaf_count: u64,
}

impl PoetProof {
    /// Reference of this proof.
    pub fn reference(&self) -> PoetProofRef {
        Hash::from_parts(&[
            self.round_id.as_bytes(),
            self.members_root.as_bytes(),
            &self.leaf_count.to_le_bytes(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_reference_binds_all_fields() {
        let proof = PoetProof {
            round_id: "7".into(),
            members_root: Hash::from_bytes(b"root"),
            leaf_count: 100,
        };
        let mut more_leaves = proof.clone();
        more_leaves.leaf_count = 101;
        let mut other_round = proof.clone();
        other_round.round_id = "8".into();

        assert_eq!(proof.reference(), proof.clone().reference());
        assert_ne!(proof.reference(), more_leaves.reference());
        assert_ne!(proof.reference(), other_round.reference());
    }
}
