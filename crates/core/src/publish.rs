use crate::PublishError;
use async_trait::async_trait;

/// Gossip broadcast.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, protocol: &str, payload: &[u8]) -> Result<(), PublishError>;
}
