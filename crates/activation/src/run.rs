//! Per-identity control loop.

use crate::builder::BuilderContext;
use crate::error::{classify, RecoveryAction};
use crate::wait::{cancellable, sleep, wait_next_layer};
use crate::ActivationError;
use smesher_core::PostError;
use smesher_types::{CycleStage, EdSigner, InitialPost, NodeId, PostMetadata, ZERO_CHALLENGE};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

impl BuilderContext {
    /// Drive `signer` through proving cycles until `cancel` fires.
    pub(crate) async fn run(self: Arc<Self>, cancel: CancellationToken, signer: Arc<EdSigner>) {
        let node = signer.node_id();
        info!(smesher = %node, "atx builder started");
        self.run_cycles(&cancel, &signer).await;
        self.stages.set(node, CycleStage::Stopped);
        info!(smesher = %node, "atx builder stopped");
    }

    async fn run_cycles(&self, cancel: &CancellationToken, signer: &EdSigner) {
        let node = signer.node_id();

        self.stages.set(node, CycleStage::AwaitingInitialPost);
        loop {
            match self.build_initial_post(cancel, &node).await {
                Ok(()) => break,
                Err(ActivationError::Canceled) => return,
                Err(err) => {
                    error!(smesher = %node, error = %err, "failed to generate initial proof");
                    if wait_next_layer(cancel, &*self.clock).await.is_err() {
                        return;
                    }
                }
            }
        }

        loop {
            self.stages.set(node, CycleStage::Ready);
            let err = match self.publish_activation_tx(cancel, signer).await {
                Ok(_) => continue,
                Err(err) => err,
            };

            let waited = match classify(&err) {
                RecoveryAction::Exit => return,
                RecoveryAction::DiscardChallenge => {
                    warn!(smesher = %node, error = %err, "failed to publish atx");
                    debug!(smesher = %node, "retrying with new challenge after waiting for a layer");
                    if let Err(err) = self.nipost_builder.reset_state(&node) {
                        error!(smesher = %node, error = %err, "failed to reset nipost builder state");
                    }
                    if let Err(err) = self.local_store.remove_challenge(&node) {
                        error!(smesher = %node, error = %err, "failed to discard challenge");
                    }
                    wait_next_layer(cancel, &*self.clock).await
                }
                RecoveryAction::RetryAfterPoetInterval => {
                    warn!(
                        smesher = %node,
                        error = %err,
                        interval = ?self.config.poet_retry_interval,
                        "retrying after poet retry interval"
                    );
                    sleep(cancel, self.config.poet_retry_interval).await
                }
                RecoveryAction::WaitLayer => {
                    warn!(smesher = %node, error = %err, "failed to publish atx");
                    wait_next_layer(cancel, &*self.clock).await
                }
            };
            if waited.is_err() {
                return;
            }
        }
    }

    /// Make sure the identity has an initial post (or an ATX, which makes
    /// one unnecessary).
    pub(crate) async fn build_initial_post(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
    ) -> Result<(), ActivationError> {
        if self.atxs.last_atx(node)?.is_some() {
            return Ok(());
        }
        if self.local_store.initial_post(node)?.is_some() {
            info!(smesher = %node, "loaded initial post from local store");
            return Ok(());
        }

        info!(smesher = %node, "creating initial post");
        let started = Instant::now();
        let (post, post_info) = self
            .nipost_builder
            .proof(cancel, node, &ZERO_CHALLENGE)
            .await?;
        let vrf_nonce = post_info
            .nonce
            .ok_or_else(|| PostError::Failed("prover returned no vrf nonce".to_string()))?;

        let metadata = PostMetadata {
            challenge: ZERO_CHALLENGE.to_vec(),
            labels_per_unit: post_info.labels_per_unit,
        };
        let verdict = cancellable(
            cancel,
            self.validator.post(
                node,
                &post_info.commitment_atx,
                &post,
                &metadata,
                post_info.num_units,
            ),
        )
        .await?;
        if let Err(err) = verdict {
            error!(smesher = %node, error = %err, "initial post is invalid");
            self.local_store.remove_initial_post(node)?;
            return Err(ActivationError::InvalidInitialPost(err));
        }

        info!(smesher = %node, post_duration = ?started.elapsed(), "created the initial post");
        self.local_store.add_initial_post(
            node,
            &InitialPost {
                post,
                num_units: post_info.num_units,
                commitment_atx: post_info.commitment_atx,
                vrf_nonce,
            },
        )?;
        Ok(())
    }
}
