//! Positioning ATX selection.
//!
//! The positioning ATX anchors a new cycle at the highest known tick height.
//! A candidate is only usable if its whole chain validates, so selection is a
//! loop: take the highest candidate not yet rejected, validate its chain, and
//! reject it on failure.

use crate::wait::cancellable;
use crate::ActivationError;
use smesher_core::{AtxProvider, NipostValidator, VerifyChainOpts};
use smesher_types::{AtxId, NodeId};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Finds the highest fully valid ATX to position a cycle after.
pub struct PositioningSelector<'a> {
    atxs: &'a dyn AtxProvider,
    validator: &'a dyn NipostValidator,
    golden: AtxId,
    rejected: HashSet<AtxId>,
}

impl<'a> PositioningSelector<'a> {
    pub fn new(atxs: &'a dyn AtxProvider, validator: &'a dyn NipostValidator, golden: AtxId) -> Self {
        Self {
            atxs,
            validator,
            golden,
            rejected: HashSet::new(),
        }
    }

    /// Highest-tick ATX whose chain validates, or `None` if every candidate
    /// was rejected (the caller falls back to the golden ATX).
    ///
    /// Each rejection grows the rejection set, which the store must honour;
    /// a store handing back a rejected id fails with
    /// [`ActivationError::SelectionStalled`].
    pub async fn select(
        &mut self,
        cancel: &CancellationToken,
        preferred: &NodeId,
        opts: &VerifyChainOpts,
    ) -> Result<Option<AtxId>, ActivationError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ActivationError::Canceled);
            }

            let rejected = &self.rejected;
            let keep = |id: &AtxId| !rejected.contains(id);
            let Some(id) = self.atxs.id_with_max_height(preferred, &keep)? else {
                debug!(rejected = self.rejected.len(), "no positioning candidates left");
                return Ok(None);
            };
            if self.rejected.contains(&id) {
                return Err(ActivationError::SelectionStalled(id));
            }

            let verdict =
                cancellable(cancel, self.validator.verify_chain(&id, &self.golden, opts)).await?;
            match verdict {
                Ok(()) => return Ok(Some(id)),
                Err(err) => {
                    info!(atx_id = %id, error = %err, "rejecting candidate for high-tick atx");
                    self.rejected.insert(id);
                }
            }
        }
    }

    pub fn rejected(&self) -> &HashSet<AtxId> {
        &self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_core::StoreError;
    use smesher_simulation::{MemoryAtxStore, SimValidator};
    use smesher_test_helpers::{atx_id, test_header, test_node};
    use smesher_types::{AtxHeader, EpochId, VrfNonce};
    use tracing_test::traced_test;

    fn store_with(heights: &[(&[u8], u64)]) -> MemoryAtxStore {
        let store = MemoryAtxStore::new();
        for (tag, height) in heights {
            store.insert_header(test_header(atx_id(tag), test_node(9), 1, 0, *height), vec![1]);
        }
        store
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rejected_candidate_is_skipped() {
        let store = store_with(&[(b"a", 30), (b"b", 20), (b"c", 10)]);
        let validator = SimValidator::new();
        validator.reject_chain(atx_id(b"a"));
        let mut selector = PositioningSelector::new(&store, &validator, atx_id(b"golden"));

        let selected = selector
            .select(&CancellationToken::new(), &test_node(1), &VerifyChainOpts::default())
            .await
            .unwrap();

        assert_eq!(selected, Some(atx_id(b"b")));
        assert_eq!(validator.chain_checks(), vec![atx_id(b"a"), atx_id(b"b")]);
        assert!(selector.rejected().contains(&atx_id(b"a")));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_all_rejected_returns_none() {
        let store = store_with(&[(b"a", 30), (b"b", 20)]);
        let validator = SimValidator::new();
        validator.reject_chain(atx_id(b"a"));
        validator.reject_chain(atx_id(b"b"));
        let mut selector = PositioningSelector::new(&store, &validator, atx_id(b"golden"));

        let selected = selector
            .select(&CancellationToken::new(), &test_node(1), &VerifyChainOpts::default())
            .await
            .unwrap();

        assert_eq!(selected, None);
        assert_eq!(selector.rejected().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_lookup() {
        let store = store_with(&[(b"a", 30)]);
        let validator = SimValidator::new();
        let mut selector = PositioningSelector::new(&store, &validator, atx_id(b"golden"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = selector
            .select(&cancel, &test_node(1), &VerifyChainOpts::default())
            .await;
        assert!(matches!(result, Err(ActivationError::Canceled)));
        assert!(validator.chain_checks().is_empty());
    }

    /// Store that ignores the filter.
    struct IgnoresFilter(MemoryAtxStore);

    impl AtxProvider for IgnoresFilter {
        fn last_atx(&self, node: &NodeId) -> Result<Option<AtxHeader>, StoreError> {
            self.0.last_atx(node)
        }

        fn atx_header(&self, id: &AtxId) -> Result<Option<AtxHeader>, StoreError> {
            self.0.atx_header(id)
        }

        fn id_with_max_height(
            &self,
            preferred: &NodeId,
            _keep: &dyn Fn(&AtxId) -> bool,
        ) -> Result<Option<AtxId>, StoreError> {
            self.0.id_with_max_height(preferred, &|_| true)
        }

        fn vrf_nonce(
            &self,
            node: &NodeId,
            epoch: EpochId,
        ) -> Result<Option<VrfNonce>, StoreError> {
            self.0.vrf_nonce(node, epoch)
        }

        fn id_by_epoch_and_node(
            &self,
            epoch: EpochId,
            node: &NodeId,
        ) -> Result<Option<AtxId>, StoreError> {
            self.0.id_by_epoch_and_node(epoch, node)
        }

        fn blob(&self, id: &AtxId) -> Result<Option<Vec<u8>>, StoreError> {
            self.0.blob(id)
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_store_ignoring_rejections_stalls() {
        let store = IgnoresFilter(store_with(&[(b"a", 30)]));
        let validator = SimValidator::new();
        validator.reject_chain(atx_id(b"a"));
        let mut selector = PositioningSelector::new(&store, &validator, atx_id(b"golden"));

        let result = selector
            .select(&CancellationToken::new(), &test_node(1), &VerifyChainOpts::default())
            .await;
        assert!(matches!(result, Err(ActivationError::SelectionStalled(id)) if id == atx_id(b"a")));
    }
}
