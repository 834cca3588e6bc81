//! Proof validation.

use crate::ValidationError;
use async_trait::async_trait;
use smesher_types::{AtxId, NodeId, Post, PostMetadata};
use std::time::SystemTime;

/// Options for [`NipostValidator::verify_chain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyChainOpts {
    /// ATXs received before this time are assumed valid without re-checking
    /// their PoST.
    pub assume_valid_before: Option<SystemTime>,
    /// ATXs of this identity are trusted.
    pub trusted_node: Option<NodeId>,
}

#[async_trait]
pub trait NipostValidator: Send + Sync {
    /// Verify a PoST generated by `node` over data committed to
    /// `commitment_atx`.
    async fn post(
        &self,
        node: &NodeId,
        commitment_atx: &AtxId,
        post: &Post,
        metadata: &PostMetadata,
        num_units: u32,
    ) -> Result<(), ValidationError>;

    /// Verify the ATX `id` and every ATX it transitively references, down to
    /// `golden`.
    async fn verify_chain(
        &self,
        id: &AtxId,
        golden: &AtxId,
        opts: &VerifyChainOpts,
    ) -> Result<(), ValidationError>;
}
