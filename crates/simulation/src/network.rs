//! Gossip network stand-in.

use crate::MemoryAtxStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smesher_core::{PublishError, Publisher};
use smesher_messages::{decode_atx, ATX_PROTOCOL};
use std::sync::Arc;
use tracing::{debug, warn};

struct Inner {
    attempted: Vec<Vec<u8>>,
    delivered: Vec<(String, Vec<u8>)>,
    fail_next: usize,
    loss_rate: f64,
    rng: ChaCha8Rng,
}

/// [`Publisher`] that records every delivered message.
///
/// Delivered ATXs are decoded and stored into the attached
/// [`MemoryAtxStore`], so identities see each other's ATXs as positioning
/// candidates. Failures are injected either as a fixed number of upcoming
/// attempts or as a seeded random loss rate.
pub struct SimNetwork {
    inner: Mutex<Inner>,
    store: Option<(Arc<MemoryAtxStore>, u64)>,
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimNetwork {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                attempted: Vec::new(),
                delivered: Vec::new(),
                fail_next: 0,
                loss_rate: 0.0,
                rng: ChaCha8Rng::seed_from_u64(0),
            }),
            store: None,
        }
    }

    /// Store delivered ATXs in `store`, each `ticks` above its positioning
    /// ATX.
    pub fn with_store(mut self, store: Arc<MemoryAtxStore>, ticks: u64) -> Self {
        self.store = Some((store, ticks));
        self
    }

    /// Drop each publish attempt with probability `rate`, seeded by `seed`.
    pub fn with_loss(self, rate: f64, seed: u64) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.loss_rate = rate.clamp(0.0, 1.0);
            inner.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        self
    }

    /// Fail the next `count` publish attempts.
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().fail_next = count;
    }

    pub fn attempts(&self) -> usize {
        self.inner.lock().attempted.len()
    }

    /// Payloads of every publish attempt, including failed ones.
    pub fn attempted(&self) -> Vec<Vec<u8>> {
        self.inner.lock().attempted.clone()
    }

    /// Payloads delivered on `protocol`, in order.
    pub fn delivered(&self, protocol: &str) -> Vec<Vec<u8>> {
        self.inner
            .lock()
            .delivered
            .iter()
            .filter(|(p, _)| p == protocol)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for SimNetwork {
    async fn publish(&self, protocol: &str, payload: &[u8]) -> Result<(), PublishError> {
        {
            let mut inner = self.inner.lock();
            inner.attempted.push(payload.to_vec());
            if inner.fail_next > 0 {
                inner.fail_next -= 1;
                return Err(PublishError::NoPeers);
            }
            let rate = inner.loss_rate;
            if rate > 0.0 && inner.rng.gen_bool(rate) {
                return Err(PublishError::Transport("message dropped".to_string()));
            }
            inner.delivered.push((protocol.to_string(), payload.to_vec()));
        }

        if protocol != ATX_PROTOCOL {
            return Ok(());
        }
        let Some((store, ticks)) = &self.store else {
            return Ok(());
        };
        match decode_atx(payload) {
            Ok(atx) => {
                let header = store.store_atx(&atx, payload.to_vec(), *ticks);
                debug!(
                    atx_id = %header.id,
                    smesher = %header.node_id,
                    publish_epoch = %header.publish_epoch,
                    "atx delivered"
                );
            }
            Err(err) => warn!(error = %err, "undecodable atx delivered"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_core::AtxProvider;
    use smesher_messages::encode_atx;
    use smesher_test_helpers::{signed_atx, test_signer};

    #[tokio::test]
    async fn test_injected_failures_then_delivery() {
        let network = SimNetwork::new();
        network.fail_next(2);

        assert!(network.publish(ATX_PROTOCOL, b"x").await.is_err());
        assert!(network.publish(ATX_PROTOCOL, b"x").await.is_err());
        network.publish(ATX_PROTOCOL, b"x").await.unwrap();

        assert_eq!(network.attempts(), 3);
        assert_eq!(network.delivered(ATX_PROTOCOL), vec![b"x".to_vec()]);
    }

    #[tokio::test]
    async fn test_delivered_atx_is_stored() {
        let store = Arc::new(MemoryAtxStore::new());
        let network = SimNetwork::new().with_store(store.clone(), 10);
        let signer = test_signer(1);
        let atx = signed_atx(&signer, 2, 1);

        network
            .publish(ATX_PROTOCOL, &encode_atx(&atx).unwrap())
            .await
            .unwrap();

        let last = store.last_atx(&signer.node_id()).unwrap().unwrap();
        assert_eq!(last.id, atx.id());
        assert_eq!(last.tick_height, 10);
    }

    #[tokio::test]
    async fn test_full_loss_drops_everything() {
        let network = SimNetwork::new().with_loss(1.0, 7);
        for _ in 0..5 {
            assert!(network.publish("other", b"y").await.is_err());
        }
        assert!(network.delivered("other").is_empty());
    }
}
