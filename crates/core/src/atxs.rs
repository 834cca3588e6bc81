//! ATX store access and the sync signal.

use crate::StoreError;
use async_trait::async_trait;
use smesher_types::{AtxHeader, AtxId, EpochId, NodeId, VrfNonce};

/// Signals when the node has caught up with the network's ATXs.
#[async_trait]
pub trait AtxSyncer: Send + Sync {
    /// Resolve once ATXs are synced. Returns immediately if they already are.
    async fn wait_atx_synced(&self);
}

/// Read access to the node's ATX database.
///
/// Lookups that find nothing return `Ok(None)`; errors are reserved for
/// backend failures.
pub trait AtxProvider: Send + Sync {
    /// Latest ATX published by `node`.
    fn last_atx(&self, node: &NodeId) -> Result<Option<AtxHeader>, StoreError>;

    fn atx_header(&self, id: &AtxId) -> Result<Option<AtxHeader>, StoreError>;

    /// The ATX with the highest tick height among those `keep` accepts.
    ///
    /// Ties are broken in favour of ATXs published by `preferred`, then by
    /// the larger id.
    fn id_with_max_height(
        &self,
        preferred: &NodeId,
        keep: &dyn Fn(&AtxId) -> bool,
    ) -> Result<Option<AtxId>, StoreError>;

    /// The VRF nonce `node` is known to use in `epoch`.
    fn vrf_nonce(&self, node: &NodeId, epoch: EpochId) -> Result<Option<VrfNonce>, StoreError>;

    /// The ATX `node` published in `epoch`.
    fn id_by_epoch_and_node(
        &self,
        epoch: EpochId,
        node: &NodeId,
    ) -> Result<Option<AtxId>, StoreError>;

    /// Encoded ATX as received from the network. Checkpointed ATXs have an
    /// empty blob.
    fn blob(&self, id: &AtxId) -> Result<Option<Vec<u8>>, StoreError>;
}
