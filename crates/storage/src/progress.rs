//! Proving progress of one cycle.

use smesher_types::{
    Hash, MerkleProof, PoetProofRef, PoetRegistration, Post, PostMetadata, VrfNonce,
};

/// How far the current cycle's NIPoST construction got.
///
/// Each completed phase is persisted as one variant. Progress moves forward
/// one phase at a time until it is reset, so after a restart the builder resumes at the
/// first phase not yet recorded. Every variant past `NotStarted` carries the
/// hash of the challenge it was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProvingProgress {
    #[default]
    NotStarted,
    /// The challenge was submitted to at least one PoET service.
    Registered {
        challenge: Hash,
        registrations: Vec<PoetRegistration>,
    },
    /// A PoET proof including the challenge was selected.
    ProofObtained {
        challenge: Hash,
        proof: PoetProofRef,
        membership: MerkleProof,
        leaf_count: u64,
    },
    /// The PoST was executed against the PoET proof.
    ProofExecuted {
        challenge: Hash,
        proof: PoetProofRef,
        membership: MerkleProof,
        post: Post,
        metadata: PostMetadata,
        num_units: u32,
        vrf_nonce: VrfNonce,
    },
}

impl ProvingProgress {
    pub fn phase(&self) -> u8 {
        match self {
            ProvingProgress::NotStarted => 0,
            ProvingProgress::Registered { .. } => 1,
            ProvingProgress::ProofObtained { .. } => 2,
            ProvingProgress::ProofExecuted { .. } => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProvingProgress::NotStarted => "not_started",
            ProvingProgress::Registered { .. } => "registered",
            ProvingProgress::ProofObtained { .. } => "proof_obtained",
            ProvingProgress::ProofExecuted { .. } => "proof_executed",
        }
    }

    /// Hash of the challenge this progress belongs to.
    pub fn challenge(&self) -> Option<Hash> {
        match self {
            ProvingProgress::NotStarted => None,
            ProvingProgress::Registered { challenge, .. }
            | ProvingProgress::ProofObtained { challenge, .. }
            | ProvingProgress::ProofExecuted { challenge, .. } => Some(*challenge),
        }
    }

    /// Whether `next` may replace `self`: it must be the immediately
    /// following phase of the same challenge. Returning to `NotStarted`
    /// goes through a reset.
    pub fn can_advance_to(&self, next: &ProvingProgress) -> bool {
        if next.phase() != self.phase() + 1 {
            return false;
        }
        match self.challenge() {
            Some(current) => next.challenge() == Some(current),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(challenge: Hash) -> ProvingProgress {
        ProvingProgress::Registered {
            challenge,
            registrations: vec![],
        }
    }

    fn obtained(challenge: Hash) -> ProvingProgress {
        ProvingProgress::ProofObtained {
            challenge,
            proof: Hash::from_bytes(b"proof"),
            membership: MerkleProof {
                leaf_index: 0,
                siblings: vec![],
            },
            leaf_count: 10,
        }
    }

    fn executed(challenge: Hash) -> ProvingProgress {
        ProvingProgress::ProofExecuted {
            challenge,
            proof: Hash::from_bytes(b"proof"),
            membership: MerkleProof {
                leaf_index: 0,
                siblings: vec![],
            },
            post: Post {
                nonce: 1,
                indices: vec![1],
                pow: 2,
            },
            metadata: PostMetadata {
                challenge: vec![0u8; 32],
                labels_per_unit: 1024,
            },
            num_units: 4,
            vrf_nonce: VrfNonce(7),
        }
    }

    #[test]
    fn test_forward_only() {
        let ch = Hash::from_bytes(b"challenge");

        assert!(ProvingProgress::NotStarted.can_advance_to(&registered(ch)));
        assert!(registered(ch).can_advance_to(&obtained(ch)));

        assert!(!obtained(ch).can_advance_to(&registered(ch)));
        assert!(!registered(ch).can_advance_to(&registered(ch)));
        assert!(!registered(ch).can_advance_to(&ProvingProgress::NotStarted));
    }

    #[test]
    fn test_phases_cannot_be_skipped() {
        let ch = Hash::from_bytes(b"challenge");

        assert!(!ProvingProgress::NotStarted.can_advance_to(&obtained(ch)));
        assert!(!ProvingProgress::NotStarted.can_advance_to(&executed(ch)));
        assert!(!registered(ch).can_advance_to(&executed(ch)));
        assert!(obtained(ch).can_advance_to(&executed(ch)));
    }

    #[test]
    fn test_challenge_must_match() {
        let a = Hash::from_bytes(b"a");
        let b = Hash::from_bytes(b"b");

        assert!(!registered(a).can_advance_to(&obtained(b)));
        assert_eq!(registered(a).challenge(), Some(a));
        assert_eq!(ProvingProgress::NotStarted.challenge(), None);
    }
}
