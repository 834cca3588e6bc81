//! NIPoST challenges.

use crate::{AtxId, EpochId, Hash, Post};
use sbor::prelude::*;

/// Domain tag for challenge hashes.
const CHALLENGE_HASH_DOMAIN: &[u8] = b"smesher/challenge/v1";

/// The per-cycle challenge an identity proves against.
///
/// An initial challenge (no previous ATX) carries the commitment ATX and the
/// initial PoST; a regular challenge links to the identity's previous ATX.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct NipostChallenge {
    /// Epoch the resulting ATX is published in.
    pub publish_epoch: EpochId,
    /// Position in the identity's ATX chain, starting at 0.
    pub sequence: u64,
    /// Previous ATX of the identity, or [`AtxId::EMPTY`].
    pub prev_atx_id: AtxId,
    /// Anchor ATX this cycle is positioned after.
    pub positioning_atx: AtxId,
    /// Commitment ATX, set only on the initial challenge.
    pub commitment_atx: Option<AtxId>,
    /// Initial PoST, set only on the initial challenge.
    pub initial_post: Option<Post>,
}

impl NipostChallenge {
    /// Epoch in which the resulting ATX grants eligibility.
    pub fn target_epoch(&self) -> EpochId {
        self.publish_epoch.next()
    }

    /// Whether this is the identity's first challenge.
    pub fn is_initial(&self) -> bool {
        self.initial_post.is_some()
    }

    /// Canonical encoding of all fields.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        self.write_canonical(&mut out);
        out
    }

    /// Domain-separated hash of the canonical encoding.
    ///
    /// This is the value submitted to PoET services and the leaf proven in
    /// the round's membership tree.
    pub fn hash(&self) -> Hash {
        Hash::from_parts(&[CHALLENGE_HASH_DOMAIN, &self.to_bytes()])
    }

    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.publish_epoch.0.to_le_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(self.prev_atx_id.as_bytes());
        out.extend_from_slice(self.positioning_atx.as_bytes());
        match &self.commitment_atx {
            Some(id) => {
                out.push(1);
                out.extend_from_slice(id.as_bytes());
            }
            None => out.push(0),
        }
        match &self.initial_post {
            Some(post) => {
                out.push(1);
                post.write_canonical(out);
            }
            None => out.push(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular() -> NipostChallenge {
        NipostChallenge {
            publish_epoch: EpochId(4),
            sequence: 3,
            prev_atx_id: AtxId(Hash::from_bytes(b"prev")),
            positioning_atx: AtxId(Hash::from_bytes(b"pos")),
            commitment_atx: None,
            initial_post: None,
        }
    }

    #[test]
    fn test_target_epoch() {
        assert_eq!(regular().target_epoch(), EpochId(5));
    }

    #[test]
    fn test_initial_flag() {
        let mut challenge = regular();
        assert!(!challenge.is_initial());

        challenge.initial_post = Some(Post {
            nonce: 1,
            indices: vec![1, 2],
            pow: 3,
        });
        assert!(challenge.is_initial());
    }

    #[test]
    fn test_hash_changes_with_fields() {
        let base = regular();

        let mut seq = base.clone();
        seq.sequence += 1;
        let mut pos = base.clone();
        pos.positioning_atx = AtxId(Hash::from_bytes(b"other"));
        let mut commit = base.clone();
        commit.commitment_atx = Some(AtxId::EMPTY);

        assert_eq!(base.hash(), base.clone().hash());
        assert_ne!(base.hash(), seq.hash());
        assert_ne!(base.hash(), pos.hash());
        assert_ne!(base.hash(), commit.hash());
    }
}
