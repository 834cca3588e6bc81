//! Proof-of-Space-Time (PoST) types.

use crate::{AtxId, NodeId, VrfNonce};
use sbor::prelude::*;

/// Challenge used for the initial PoST, executed before any PoET proof exists.
pub const ZERO_CHALLENGE: [u8; 32] = [0u8; 32];

/// A PoST proof as produced by the external prover.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Post {
    /// Nonce of the proof.
    pub nonce: u32,
    /// Encoded label indices.
    pub indices: Vec<u8>,
    /// Proof-of-work value.
    pub pow: u64,
}

impl Post {
    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&(self.indices.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.indices);
        out.extend_from_slice(&self.pow.to_le_bytes());
    }
}

/// Metadata a verifier needs to check a [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct PostMetadata {
    /// Challenge the proof was executed against.
    pub challenge: Vec<u8>,
    /// Labels per storage unit of the identity's PoST data.
    pub labels_per_unit: u64,
}

impl PostMetadata {
    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.challenge.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.challenge);
        out.extend_from_slice(&self.labels_per_unit.to_le_bytes());
    }
}

/// Information about the PoST data a proof was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInfo {
    /// Identity owning the data.
    pub node_id: NodeId,
    /// Commitment ATX the data was initialized against.
    pub commitment_atx: AtxId,
    /// VRF nonce found during initialization, if known.
    pub nonce: Option<VrfNonce>,
    /// Number of storage units.
    pub num_units: u32,
    /// Labels per storage unit.
    pub labels_per_unit: u64,
}

/// The identity's first PoST, persisted before its first challenge is built.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct InitialPost {
    /// The proof against [`ZERO_CHALLENGE`].
    pub post: Post,
    /// Number of storage units.
    pub num_units: u32,
    /// Commitment ATX the data was initialized against.
    pub commitment_atx: AtxId,
    /// VRF nonce found during initialization.
    pub vrf_nonce: VrfNonce,
}
