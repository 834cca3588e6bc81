//! Proof validation stand-in.

use crate::{simulated_post, MemoryAtxStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use smesher_core::{AtxProvider, NipostValidator, ValidationError, VerifyChainOpts};
use smesher_types::{AtxId, NodeId, Post, PostMetadata};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    rejected_chains: HashSet<AtxId>,
    rejected_posts: HashSet<NodeId>,
    chain_checks: Vec<AtxId>,
    post_checks: usize,
}

/// [`NipostValidator`] checking [`simulated_post`] proofs.
///
/// Chains are valid unless they contain an ATX marked with
/// [`reject_chain`](Self::reject_chain). With a store attached the whole
/// chain is walked down to the golden ATX and unknown ATXs are invalid;
/// without one only the queried id is checked.
#[derive(Default)]
pub struct SimValidator {
    inner: Mutex<Inner>,
    store: Option<Arc<MemoryAtxStore>>,
}

impl SimValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<MemoryAtxStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Treat every chain containing `id` as invalid.
    pub fn reject_chain(&self, id: AtxId) {
        self.inner.lock().rejected_chains.insert(id);
    }

    /// Treat every PoST of `node` as invalid.
    pub fn reject_posts(&self, node: NodeId) {
        self.inner.lock().rejected_posts.insert(node);
    }

    pub fn accept_posts(&self, node: &NodeId) {
        self.inner.lock().rejected_posts.remove(node);
    }

    /// Ids passed to `verify_chain`, in call order.
    pub fn chain_checks(&self) -> Vec<AtxId> {
        self.inner.lock().chain_checks.clone()
    }

    pub fn post_checks(&self) -> usize {
        self.inner.lock().post_checks
    }

    fn walk(&self, id: &AtxId, golden: &AtxId, store: &MemoryAtxStore) -> Result<(), ValidationError> {
        let rejected = self.inner.lock().rejected_chains.clone();
        let mut pending = vec![*id];
        let mut seen = HashSet::new();
        while let Some(next) = pending.pop() {
            if next == *golden || next.is_empty() || !seen.insert(next) {
                continue;
            }
            if rejected.contains(&next) {
                return Err(ValidationError::InvalidChain {
                    id: next,
                    reason: "rejected".to_string(),
                });
            }
            let header = store
                .atx_header(&next)
                .map_err(|e| ValidationError::InvalidChain {
                    id: next,
                    reason: e.to_string(),
                })?
                .ok_or(ValidationError::UnknownAtx(next))?;
            pending.push(header.prev_atx_id);
            pending.push(header.positioning_atx);
        }
        Ok(())
    }
}

#[async_trait]
impl NipostValidator for SimValidator {
    async fn post(
        &self,
        node: &NodeId,
        commitment_atx: &AtxId,
        post: &Post,
        metadata: &PostMetadata,
        num_units: u32,
    ) -> Result<(), ValidationError> {
        let rejected = {
            let mut inner = self.inner.lock();
            inner.post_checks += 1;
            inner.rejected_posts.contains(node)
        };
        if rejected {
            return Err(ValidationError::InvalidPost("rejected".to_string()));
        }
        if *post != simulated_post(node, commitment_atx, &metadata.challenge, num_units) {
            return Err(ValidationError::InvalidPost(
                "proof does not match challenge".to_string(),
            ));
        }
        Ok(())
    }

    async fn verify_chain(
        &self,
        id: &AtxId,
        golden: &AtxId,
        _opts: &VerifyChainOpts,
    ) -> Result<(), ValidationError> {
        let rejected = {
            let mut inner = self.inner.lock();
            inner.chain_checks.push(*id);
            inner.rejected_chains.contains(id)
        };
        if rejected {
            return Err(ValidationError::InvalidChain {
                id: *id,
                reason: "rejected".to_string(),
            });
        }
        match &self.store {
            Some(store) => self.walk(id, golden, store),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_test_helpers::{atx_id, test_header, test_node};
    use smesher_types::AtxHeader;

    fn header(tag: &[u8], prev: AtxId, positioning: AtxId) -> AtxHeader {
        let mut header = test_header(atx_id(tag), test_node(1), 1, 0, 10);
        header.prev_atx_id = prev;
        header.positioning_atx = positioning;
        header
    }

    #[tokio::test]
    async fn test_chain_walk_finds_rejected_ancestor() {
        let golden = atx_id(b"golden");
        let store = Arc::new(MemoryAtxStore::new());
        store.insert_header(header(b"a", AtxId::EMPTY, golden), vec![1]);
        store.insert_header(header(b"b", atx_id(b"a"), golden), vec![1]);
        store.insert_header(header(b"c", AtxId::EMPTY, atx_id(b"b")), vec![1]);
        let validator = SimValidator::new().with_store(store);
        let opts = VerifyChainOpts::default();

        validator.verify_chain(&atx_id(b"c"), &golden, &opts).await.unwrap();

        validator.reject_chain(atx_id(b"a"));
        let err = validator
            .verify_chain(&atx_id(b"c"), &golden, &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChain { id, .. } if id == atx_id(b"a")));
        assert_eq!(validator.chain_checks().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_ancestor_is_invalid() {
        let golden = atx_id(b"golden");
        let store = Arc::new(MemoryAtxStore::new());
        store.insert_header(header(b"a", atx_id(b"missing"), golden), vec![1]);
        let validator = SimValidator::new().with_store(store);

        let err = validator
            .verify_chain(&atx_id(b"a"), &golden, &VerifyChainOpts::default())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownAtx(atx_id(b"missing")));
    }

    #[tokio::test]
    async fn test_post_must_match_challenge() {
        let node = test_node(1);
        let commitment = atx_id(b"commit");
        let metadata = PostMetadata {
            challenge: vec![0u8; 32],
            labels_per_unit: 1024,
        };
        let post = simulated_post(&node, &commitment, &metadata.challenge, 4);
        let validator = SimValidator::new();

        validator.post(&node, &commitment, &post, &metadata, 4).await.unwrap();
        assert!(validator.post(&node, &commitment, &post, &metadata, 5).await.is_err());

        validator.reject_posts(node);
        assert!(validator.post(&node, &commitment, &post, &metadata, 4).await.is_err());
        assert_eq!(validator.post_checks(), 3);
    }
}
