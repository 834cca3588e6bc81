//! PoST prover stand-in.

use async_trait::async_trait;
use parking_lot::Mutex;
use smesher_core::{PostError, PostProver};
use smesher_types::{AtxId, Hash, NodeId, Post, PostInfo, VrfNonce};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// The proof [`SimPostProver`] produces, and [`SimValidator`](crate::SimValidator)
/// expects, for these inputs.
pub fn simulated_post(node: &NodeId, commitment_atx: &AtxId, challenge: &[u8], num_units: u32) -> Post {
    let digest = Hash::from_parts(&[
        b"sim-post",
        node.as_bytes(),
        commitment_atx.as_bytes(),
        challenge,
        &num_units.to_le_bytes(),
    ]);
    let bytes = digest.as_bytes();
    Post {
        nonce: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        indices: bytes[4..20].to_vec(),
        pow: u64::from_le_bytes([
            bytes[20], bytes[21], bytes[22], bytes[23], bytes[24], bytes[25], bytes[26], bytes[27],
        ]),
    }
}

/// VRF nonce "found" during initialization of `node`'s data.
pub fn simulated_vrf_nonce(node: &NodeId) -> VrfNonce {
    let id = node.as_bytes();
    VrfNonce(u64::from_le_bytes([
        id[0], id[1], id[2], id[3], id[4], id[5], id[6], id[7],
    ]))
}

/// [`PostProver`] producing [`simulated_post`] proofs.
pub struct SimPostProver {
    commitment_atx: AtxId,
    num_units: u32,
    labels_per_unit: u64,
    delay: Mutex<Duration>,
    proofs: AtomicUsize,
    failing: AtomicBool,
}

impl SimPostProver {
    pub fn new(commitment_atx: AtxId, num_units: u32, labels_per_unit: u64) -> Self {
        Self {
            commitment_atx,
            num_units,
            labels_per_unit,
            delay: Mutex::new(Duration::ZERO),
            proofs: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Time each proof takes.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Proofs generated so far.
    pub fn proofs(&self) -> usize {
        self.proofs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostProver for SimPostProver {
    async fn proof(&self, node: &NodeId, challenge: &[u8]) -> Result<(Post, PostInfo), PostError> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PostError::Failed("injected failure".to_string()));
        }

        self.proofs.fetch_add(1, Ordering::SeqCst);
        let post = simulated_post(node, &self.commitment_atx, challenge, self.num_units);
        let info = PostInfo {
            node_id: *node,
            commitment_atx: self.commitment_atx,
            nonce: Some(simulated_vrf_nonce(node)),
            num_units: self.num_units,
            labels_per_unit: self.labels_per_unit,
        };
        Ok((post, info))
    }
}
