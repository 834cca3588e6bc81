//! Deterministic fixtures for tests across the workspace.
//!
//! Signers are derived from a one-byte seed so that the same seed always
//! yields the same identity, and ATXs built here carry valid signatures.

use smesher_types::{
    ActivationTx, Address, AtxContent, AtxHeader, AtxId, EdSigner, EpochId, Hash, InitialPost,
    MerkleProof, NIPost, NipostChallenge, NodeId, Post, PostMetadata, VrfNonce,
};

/// Signer derived from `seed`.
pub fn test_signer(seed: u8) -> EdSigner {
    EdSigner::from_seed(&[seed; 32])
}

/// Node id of [`test_signer`]`(seed)`.
pub fn test_node(seed: u8) -> NodeId {
    test_signer(seed).node_id()
}

/// ATX id derived from a tag.
pub fn atx_id(tag: &[u8]) -> AtxId {
    AtxId(Hash::from_bytes(tag))
}

pub fn test_post(nonce: u32) -> Post {
    Post {
        nonce,
        indices: vec![nonce as u8, 1, 2, 3],
        pow: u64::from(nonce) * 7,
    }
}

pub fn test_initial_post(commitment_atx: AtxId) -> InitialPost {
    InitialPost {
        post: test_post(1),
        num_units: 4,
        commitment_atx,
        vrf_nonce: VrfNonce(42),
    }
}

/// Regular challenge linking to `prev`.
pub fn regular_challenge(publish_epoch: u32, sequence: u64, prev: AtxId) -> NipostChallenge {
    NipostChallenge {
        publish_epoch: EpochId(publish_epoch),
        sequence,
        prev_atx_id: prev,
        positioning_atx: atx_id(b"positioning"),
        commitment_atx: None,
        initial_post: None,
    }
}

/// Initial challenge carrying `initial.post`.
pub fn initial_challenge(publish_epoch: u32, initial: &InitialPost) -> NipostChallenge {
    NipostChallenge {
        publish_epoch: EpochId(publish_epoch),
        sequence: 0,
        prev_atx_id: AtxId::EMPTY,
        positioning_atx: atx_id(b"golden"),
        commitment_atx: Some(initial.commitment_atx),
        initial_post: Some(initial.post.clone()),
    }
}

pub fn test_nipost() -> NIPost {
    NIPost {
        membership: MerkleProof {
            leaf_index: 0,
            siblings: vec![],
        },
        post: test_post(9),
        post_metadata: PostMetadata {
            challenge: Hash::from_bytes(b"poet proof").to_bytes().to_vec(),
            labels_per_unit: 1024,
        },
    }
}

/// A validly signed regular ATX.
pub fn signed_atx(signer: &EdSigner, publish_epoch: u32, sequence: u64) -> ActivationTx {
    let content = AtxContent {
        challenge: regular_challenge(publish_epoch, sequence, atx_id(b"prev")),
        coinbase: Address([3u8; 24]),
        num_units: 4,
        nipost: test_nipost(),
        vrf_nonce: None,
        node_id: None,
    };
    ActivationTx::sign(content, signer)
}

pub fn test_header(
    id: AtxId,
    node_id: NodeId,
    publish_epoch: u32,
    sequence: u64,
    tick_height: u64,
) -> AtxHeader {
    AtxHeader {
        id,
        node_id,
        publish_epoch: EpochId(publish_epoch),
        sequence,
        prev_atx_id: AtxId::EMPTY,
        positioning_atx: AtxId::EMPTY,
        num_units: 4,
        tick_height,
    }
}
