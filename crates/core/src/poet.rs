use crate::PoetError;
use async_trait::async_trait;
use smesher_types::{Hash, NodeId, PoetProof, PoetRound, Signature};
use std::time::SystemTime;

/// Client for one PoET service.
#[async_trait]
pub trait PoetClient: Send + Sync {
    /// Address identifying the service.
    fn address(&self) -> &str;

    /// Register `challenge` for the next round. The service must accept the
    /// registration before `deadline`.
    async fn submit(
        &self,
        deadline: SystemTime,
        challenge: &Hash,
        signature: &Signature,
        node: &NodeId,
    ) -> Result<PoetRound, PoetError>;

    /// Proof for a finished round, with the round's member challenges.
    async fn proof(&self, round_id: &str) -> Result<(PoetProof, Vec<Hash>), PoetError>;
}
