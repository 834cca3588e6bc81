//! In-memory ATX database.

use parking_lot::Mutex;
use smesher_core::{AtxProvider, StoreError};
use smesher_types::{ActivationTx, AtxHeader, AtxId, EpochId, NodeId, VrfNonce};
use std::collections::HashMap;
use tracing::trace;

#[derive(Default)]
struct Inner {
    headers: HashMap<AtxId, AtxHeader>,
    blobs: HashMap<AtxId, Vec<u8>>,
    /// Nonces per identity, keyed by the first epoch they apply to.
    nonces: HashMap<NodeId, Vec<(EpochId, VrfNonce)>>,
    failing: bool,
}

/// [`AtxProvider`] over in-memory maps.
#[derive(Default)]
pub struct MemoryAtxStore {
    inner: Mutex<Inner>,
}

impl MemoryAtxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header as if it had been received with `blob`.
    pub fn insert_header(&self, header: AtxHeader, blob: Vec<u8>) {
        let mut inner = self.inner.lock();
        inner.blobs.insert(header.id, blob);
        inner.headers.insert(header.id, header);
    }

    /// Insert a checkpointed ATX: known header and nonce, no blob.
    pub fn checkpoint(&self, header: AtxHeader, vrf_nonce: VrfNonce) {
        let mut inner = self.inner.lock();
        inner
            .nonces
            .entry(header.node_id)
            .or_default()
            .push((header.target_epoch(), vrf_nonce));
        inner.blobs.insert(header.id, Vec::new());
        inner.headers.insert(header.id, header);
    }

    /// Store a received ATX. Its tick height extends the positioning ATX's
    /// height by `ticks`. Storing the same ATX twice is a no-op.
    pub fn store_atx(&self, atx: &ActivationTx, blob: Vec<u8>, ticks: u64) -> AtxHeader {
        let id = atx.id();
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.headers.get(&id) {
            return existing.clone();
        }

        let base = inner
            .headers
            .get(&atx.positioning_atx())
            .map_or(0, |h| h.tick_height);
        let header = AtxHeader {
            id,
            node_id: atx.smesher_id(),
            publish_epoch: atx.publish_epoch(),
            sequence: atx.sequence(),
            prev_atx_id: atx.prev_atx_id(),
            positioning_atx: atx.positioning_atx(),
            num_units: atx.num_units(),
            tick_height: base + ticks,
        };
        if let Some(nonce) = atx.vrf_nonce() {
            inner
                .nonces
                .entry(header.node_id)
                .or_default()
                .push((header.target_epoch(), nonce));
        }
        trace!(atx_id = %id, smesher = %header.node_id, tick_height = header.tick_height, "stored atx");
        inner.blobs.insert(id, blob);
        inner.headers.insert(id, header.clone());
        header
    }

    /// Drop the blob of `id`, keeping its header, as after pruning.
    pub fn prune_blob(&self, id: &AtxId) {
        self.inner.lock().blobs.remove(id);
    }

    /// Make every lookup fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Headers published by `node`, oldest first.
    pub fn atxs_of(&self, node: &NodeId) -> Vec<AtxHeader> {
        let inner = self.inner.lock();
        let mut atxs: Vec<AtxHeader> = inner
            .headers
            .values()
            .filter(|h| h.node_id == *node)
            .cloned()
            .collect();
        atxs.sort_by_key(|h| (h.publish_epoch, h.sequence));
        atxs
    }

    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, Inner>, StoreError> {
        let inner = self.inner.lock();
        if inner.failing {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(inner)
    }
}

impl AtxProvider for MemoryAtxStore {
    fn last_atx(&self, node: &NodeId) -> Result<Option<AtxHeader>, StoreError> {
        Ok(self
            .lock()?
            .headers
            .values()
            .filter(|h| h.node_id == *node)
            .max_by_key(|h| (h.publish_epoch, h.sequence))
            .cloned())
    }

    fn atx_header(&self, id: &AtxId) -> Result<Option<AtxHeader>, StoreError> {
        Ok(self.lock()?.headers.get(id).cloned())
    }

    fn id_with_max_height(
        &self,
        preferred: &NodeId,
        keep: &dyn Fn(&AtxId) -> bool,
    ) -> Result<Option<AtxId>, StoreError> {
        Ok(self
            .lock()?
            .headers
            .values()
            .filter(|h| keep(&h.id))
            .max_by_key(|h| (h.tick_height, h.node_id == *preferred, h.id))
            .map(|h| h.id))
    }

    fn vrf_nonce(&self, node: &NodeId, epoch: EpochId) -> Result<Option<VrfNonce>, StoreError> {
        Ok(self.lock()?.nonces.get(node).and_then(|nonces| {
            nonces
                .iter()
                .filter(|(from, _)| *from <= epoch)
                .max_by_key(|(from, _)| *from)
                .map(|(_, nonce)| *nonce)
        }))
    }

    fn id_by_epoch_and_node(
        &self,
        epoch: EpochId,
        node: &NodeId,
    ) -> Result<Option<AtxId>, StoreError> {
        Ok(self
            .lock()?
            .headers
            .values()
            .find(|h| h.publish_epoch == epoch && h.node_id == *node)
            .map(|h| h.id))
    }

    fn blob(&self, id: &AtxId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.blobs.get(id).cloned())
    }
}
