//! Activation transactions.

use crate::signing::Domain;
use crate::{
    crypto, Address, AtxId, EdSigner, EpochId, Hash, MerkleProof, NipostChallenge, NodeId, Post,
    PostMetadata, Signature, VrfNonce,
};
use sbor::prelude::*;

/// Non-interactive proof of space-time: a PoST executed against a PoET
/// proof whose round included the identity's challenge.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct NIPost {
    /// Inclusion of the challenge in the PoET round.
    pub membership: MerkleProof,
    /// The PoST.
    pub post: Post,
    /// Metadata needed to verify the PoST; its challenge is the PoET proof
    /// reference.
    pub post_metadata: PostMetadata,
}

impl NIPost {
    fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.membership.leaf_index.to_le_bytes());
        out.extend_from_slice(&(self.membership.siblings.len() as u32).to_le_bytes());
        for sibling in &self.membership.siblings {
            out.extend_from_slice(sibling.as_bytes());
        }
        self.post.write_canonical(out);
        self.post_metadata.write_canonical(out);
    }
}

/// Result of a completed proving cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NipostState {
    pub nipost: NIPost,
    pub num_units: u32,
    pub vrf_nonce: VrfNonce,
}

/// Everything an ATX commits to, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxContent {
    pub challenge: NipostChallenge,
    pub coinbase: Address,
    pub num_units: u32,
    pub nipost: NIPost,
    /// Set when the nonce is new for this identity.
    pub vrf_nonce: Option<VrfNonce>,
    /// Set on the identity's initial ATX.
    pub node_id: Option<NodeId>,
}

/// A signed, finalized activation transaction.
///
/// Immutable once constructed: the signature covers every field, so the
/// fields are only readable.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ActivationTx {
    challenge: NipostChallenge,
    coinbase: Address,
    num_units: u32,
    nipost: NIPost,
    vrf_nonce: Option<VrfNonce>,
    node_id: Option<NodeId>,
    smesher_id: NodeId,
    signature: Signature,
}

impl ActivationTx {
    /// Sign `content` with `signer` and finalize the ATX.
    pub fn sign(content: AtxContent, signer: &EdSigner) -> Self {
        let signed = signed_bytes(&content);
        let signature = signer.sign(Domain::Atx, &signed);
        let AtxContent {
            challenge,
            coinbase,
            num_units,
            nipost,
            vrf_nonce,
            node_id,
        } = content;
        Self {
            challenge,
            coinbase,
            num_units,
            nipost,
            vrf_nonce,
            node_id,
            smesher_id: signer.node_id(),
            signature,
        }
    }

    /// Identifier: hash over the signed bytes and the signature.
    pub fn id(&self) -> AtxId {
        AtxId(Hash::from_parts(&[
            &self.signed_bytes(),
            self.signature.as_bytes(),
        ]))
    }

    /// Bytes covered by the signature.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        write_content(
            &mut out,
            &self.challenge,
            &self.coinbase,
            self.num_units,
            &self.nipost,
            self.vrf_nonce,
            self.node_id,
        );
        out
    }

    /// Check the signature against the smesher identity.
    pub fn verify_signature(&self) -> bool {
        crypto::verify(
            &self.smesher_id,
            Domain::Atx,
            &self.signed_bytes(),
            &self.signature,
        )
    }

    pub fn challenge(&self) -> &NipostChallenge {
        &self.challenge
    }

    pub fn publish_epoch(&self) -> EpochId {
        self.challenge.publish_epoch
    }

    pub fn sequence(&self) -> u64 {
        self.challenge.sequence
    }

    pub fn prev_atx_id(&self) -> AtxId {
        self.challenge.prev_atx_id
    }

    pub fn positioning_atx(&self) -> AtxId {
        self.challenge.positioning_atx
    }

    pub fn coinbase(&self) -> Address {
        self.coinbase
    }

    pub fn num_units(&self) -> u32 {
        self.num_units
    }

    pub fn nipost(&self) -> &NIPost {
        &self.nipost
    }

    pub fn vrf_nonce(&self) -> Option<VrfNonce> {
        self.vrf_nonce
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    pub fn smesher_id(&self) -> NodeId {
        self.smesher_id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

fn signed_bytes(content: &AtxContent) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_content(
        &mut out,
        &content.challenge,
        &content.coinbase,
        content.num_units,
        &content.nipost,
        content.vrf_nonce,
        content.node_id,
    );
    out
}

fn write_content(
    out: &mut Vec<u8>,
    challenge: &NipostChallenge,
    coinbase: &Address,
    num_units: u32,
    nipost: &NIPost,
    vrf_nonce: Option<VrfNonce>,
    node_id: Option<NodeId>,
) {
    challenge.write_canonical(out);
    out.extend_from_slice(&coinbase.0);
    out.extend_from_slice(&num_units.to_le_bytes());
    nipost.write_canonical(out);
    match vrf_nonce {
        Some(nonce) => {
            out.push(1);
            out.extend_from_slice(&nonce.0.to_le_bytes());
        }
        None => out.push(0),
    }
    match node_id {
        Some(id) => {
            out.push(1);
            out.extend_from_slice(id.as_bytes());
        }
        None => out.push(0),
    }
}

/// Summary of a stored ATX, as kept by the ATX store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxHeader {
    pub id: AtxId,
    pub node_id: NodeId,
    pub publish_epoch: EpochId,
    pub sequence: u64,
    pub prev_atx_id: AtxId,
    pub positioning_atx: AtxId,
    pub num_units: u32,
    /// Cumulative tick height: the positioning ATX's height plus this ATX's
    /// PoET ticks.
    pub tick_height: u64,
}

impl AtxHeader {
    pub fn target_epoch(&self) -> EpochId {
        self.publish_epoch.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> AtxContent {
        AtxContent {
            challenge: NipostChallenge {
                publish_epoch: EpochId(2),
                sequence: 1,
                prev_atx_id: AtxId(Hash::from_bytes(b"prev")),
                positioning_atx: AtxId(Hash::from_bytes(b"pos")),
                commitment_atx: None,
                initial_post: None,
            },
            coinbase: Address([7u8; 24]),
            num_units: 4,
            nipost: NIPost {
                membership: MerkleProof {
                    leaf_index: 0,
                    siblings: vec![Hash::from_bytes(b"sib")],
                },
                post: Post {
                    nonce: 1,
                    indices: vec![9, 9],
                    pow: 5,
                },
                post_metadata: PostMetadata {
                    challenge: Hash::from_bytes(b"poet").to_bytes().to_vec(),
                    labels_per_unit: 1024,
                },
            },
            vrf_nonce: None,
            node_id: None,
        }
    }

    #[test]
    fn test_signed_atx_verifies() {
        let signer = EdSigner::from_seed(&[1u8; 32]);
        let atx = ActivationTx::sign(content(), &signer);

        assert!(atx.verify_signature());
        assert_eq!(atx.smesher_id(), signer.node_id());
        assert_eq!(atx.publish_epoch(), EpochId(2));
    }

    #[test]
    fn test_id_depends_on_content() {
        let signer = EdSigner::from_seed(&[1u8; 32]);
        let a = ActivationTx::sign(content(), &signer);

        let mut other = content();
        other.vrf_nonce = Some(VrfNonce(11));
        let b = ActivationTx::sign(other, &signer);

        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_decoded_atx_with_tampered_coinbase_fails_verification() {
        let signer = EdSigner::from_seed(&[1u8; 32]);
        let atx = ActivationTx::sign(content(), &signer);

        let mut tampered = atx.clone();
        tampered.coinbase = Address([8u8; 24]);
        assert!(!tampered.verify_signature());
    }
}
