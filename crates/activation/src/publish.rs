//! ATX creation and broadcast.

use crate::builder::BuilderContext;
use crate::wait::{cancellable, sleep, Deadline};
use crate::ActivationError;
use smesher_core::StoreError;
use smesher_messages::{encode_atx, ATX_PROTOCOL};
use smesher_types::{ActivationTx, AtxContent, CycleStage, EdSigner, NipostChallenge, NodeId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl BuilderContext {
    /// Run one full cycle: challenge, NIPoST, signing and broadcast.
    pub(crate) async fn publish_activation_tx(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
    ) -> Result<ActivationTx, ActivationError> {
        let node = signer.node_id();
        self.stages.set(node, CycleStage::BuildingChallenge);
        let challenge = self.build_nipost_challenge(cancel, &node).await?;
        info!(
            smesher = %node,
            current_epoch = %self.clock.current_epoch(),
            publish_epoch = %challenge.publish_epoch,
            target_epoch = %challenge.target_epoch(),
            "atx challenge is ready"
        );

        let deadline = Deadline::new(
            cancel,
            &*self.clock,
            self.clock.epoch_to_time(challenge.target_epoch()),
        );
        let atx = self
            .create_atx(deadline.token(), signer, &challenge)
            .await
            .map_err(|e| deadline.map_err(e))?;

        let payload = encode_atx(&atx)?;
        self.stages.set(node, CycleStage::Publishing);
        self.broadcast(deadline.token(), &payload)
            .await
            .map_err(|e| deadline.map_err(e))?;
        let eligible_at = self.clock.epoch_to_time(atx.challenge().target_epoch());
        info!(
            smesher = %node,
            atx_id = %atx.id(),
            publish_epoch = %atx.publish_epoch(),
            target_epoch = %atx.challenge().target_epoch(),
            sequence = atx.sequence(),
            size = payload.len(),
            eligible_in = ?eligible_at.duration_since(self.clock.now()).unwrap_or_default(),
            "atx published"
        );

        self.nipost_builder.reset_state(&node)?;
        self.local_store.remove_challenge(&node)?;
        Ok(atx)
    }

    async fn create_atx(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
        challenge: &NipostChallenge,
    ) -> Result<ActivationTx, ActivationError> {
        let node = signer.node_id();
        let publish_epoch = challenge.publish_epoch;

        self.stages.set(node, CycleStage::Proving);
        let state = self
            .nipost_builder
            .build_nipost(cancel, signer, challenge)
            .await?;

        let publish_layer = publish_epoch.first_layer(self.clock.layers_per_epoch());
        info!(
            smesher = %node,
            publish_epoch = %publish_epoch,
            publish_epoch_first_layer = %publish_layer,
            current_layer = %self.clock.current_layer(),
            "awaiting atx publication epoch"
        );
        self.stages.set(node, CycleStage::AwaitingPublicationEpoch);
        cancellable(cancel, self.clock.await_layer(publish_layer)).await?;
        debug!(smesher = %node, "publication epoch has arrived");

        if publish_epoch < self.clock.current_epoch() {
            if challenge.is_initial() {
                return Err(ActivationError::PublishEpochPassed { publish_epoch });
            }
            return Err(ActivationError::ChallengeExpired(
                "atx publish epoch has passed during nipost construction".to_string(),
            ));
        }

        let (vrf_nonce, node_id) = if challenge.prev_atx_id.is_empty() {
            (Some(state.vrf_nonce), Some(node))
        } else {
            match self.atxs.vrf_nonce(&node, publish_epoch) {
                Ok(Some(known)) if known == state.vrf_nonce => (None, None),
                Ok(Some(_)) => (Some(state.vrf_nonce), None),
                Ok(None) => {
                    warn!(smesher = %node, "no vrf nonce known for identity");
                    (None, None)
                }
                Err(err) => {
                    warn!(smesher = %node, error = %err, "failed to get vrf nonce for atx");
                    (None, None)
                }
            }
        };

        let content = AtxContent {
            challenge: challenge.clone(),
            coinbase: self.coinbase(),
            num_units: state.num_units,
            nipost: state.nipost,
            vrf_nonce,
            node_id,
        };
        Ok(ActivationTx::sign(content, signer))
    }

    /// Publish `payload` until it succeeds or `cancel` fires.
    async fn broadcast(
        &self,
        cancel: &CancellationToken,
        payload: &[u8],
    ) -> Result<(), ActivationError> {
        loop {
            match cancellable(cancel, self.publisher.publish(ATX_PROTOCOL, payload)).await? {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(error = %err, "failed to broadcast atx");
                    sleep(cancel, self.config.broadcast_retry_delay).await?;
                }
            }
        }
    }

    /// Re-publish the identity's ATX of the current epoch as stored.
    pub(crate) async fn regossip(&self, node: &NodeId) -> Result<(), ActivationError> {
        let epoch = self.clock.current_epoch();
        let Some(id) = self.atxs.id_by_epoch_and_node(epoch, node)? else {
            return Ok(());
        };
        let Some(blob) = self.atxs.blob(&id)? else {
            return Err(StoreError::Corrupt {
                id,
                reason: "blob missing".to_string(),
            }
            .into());
        };
        if blob.is_empty() {
            // Checkpointed ATX: nothing to re-publish.
            return Ok(());
        }
        self.publisher.publish(ATX_PROTOCOL, &blob).await?;
        debug!(smesher = %node, atx_id = %id, "re-gossipped atx");
        Ok(())
    }
}
