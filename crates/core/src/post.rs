use crate::PostError;
use async_trait::async_trait;
use smesher_types::{NodeId, Post, PostInfo};

/// Generates PoST proofs over an identity's initialized data.
#[async_trait]
pub trait PostProver: Send + Sync {
    async fn proof(&self, node: &NodeId, challenge: &[u8]) -> Result<(Post, PostInfo), PostError>;
}
