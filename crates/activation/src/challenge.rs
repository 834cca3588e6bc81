//! Challenge construction.

use crate::builder::BuilderContext;
use crate::config::MAX_CHALLENGE_BUILD_JITTER_PERCENT;
use crate::positioning::PositioningSelector;
use crate::wait::{cancellable, sleep_until};
use crate::ActivationError;
use rand::Rng;
use smesher_core::VerifyChainOpts;
use smesher_types::{
    AtxId, CycleStage, EpochId, NipostChallenge, NodeId, PostMetadata, PostState, ZERO_CHALLENGE,
};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

impl BuilderContext {
    /// Start of the PoET round that follows the start of `epoch`.
    pub(crate) fn poet_round_start(&self, epoch: EpochId) -> SystemTime {
        self.clock.epoch_to_time(epoch) + self.poet_config.phase_shift
    }

    /// Return the identity's persisted challenge if it is still fresh,
    /// otherwise build, persist and return a new one.
    pub(crate) async fn build_nipost_challenge(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
    ) -> Result<NipostChallenge, ActivationError> {
        cancellable(cancel, self.syncer.wait_atx_synced()).await?;
        let mut current = self.clock.current_epoch();

        match self.local_store.challenge(node)? {
            Some(challenge) if challenge.publish_epoch < current => {
                info!(
                    smesher = %node,
                    current_epoch = %current,
                    publish_epoch = %challenge.publish_epoch,
                    "existing challenge is stale, resetting state"
                );
                self.post_states.set(*node, PostState::Idle);
                self.nipost_builder.reset_state(node)?;
                self.local_store.remove_challenge(node)?;
            }
            Some(challenge) => return Ok(challenge),
            None => {}
        }
        info!(smesher = %node, current_epoch = %current, "building new challenge");

        if let Some(prev) = self.atxs.last_atx(node)? {
            current = current.max(prev.publish_epoch);
        }
        if let Ok(late_by) = self.clock.now().duration_since(self.poet_round_start(current)) {
            info!(
                smesher = %node,
                current_epoch = %current,
                late_by = ?late_by,
                "poet round already started, targeting the next one"
            );
            current = current.next();
        }

        let round_start = self.poet_round_start(current);
        let till_poet_round = round_start
            .duration_since(self.clock.now())
            .unwrap_or_default();
        let wait_until = challenge_build_start(round_start, self.poet_config.grace_period);
        if let Ok(wait) = wait_until.duration_since(self.clock.now()) {
            debug!(
                smesher = %node,
                current_epoch = %current,
                poet_round_end_epoch = %current.next(),
                till_poet_round = ?till_poet_round,
                wait = ?wait,
                "waiting for fresh atxs"
            );
            sleep_until(cancel, &*self.clock, wait_until).await?;
        }

        self.stages.set(*node, CycleStage::AwaitingAnchor);
        let positioning_atx = self.positioning_atx(cancel, node).await?;

        let challenge = match self.atxs.last_atx(node)? {
            None => {
                let initial = self
                    .local_store
                    .initial_post(node)?
                    .ok_or(ActivationError::MissingInitialPost)?;
                info!(smesher = %node, "verifying the initial post");
                let metadata = PostMetadata {
                    challenge: ZERO_CHALLENGE.to_vec(),
                    labels_per_unit: self.config.labels_per_unit,
                };
                let verdict = cancellable(
                    cancel,
                    self.validator.post(
                        node,
                        &initial.commitment_atx,
                        &initial.post,
                        &metadata,
                        initial.num_units,
                    ),
                )
                .await?;
                if let Err(err) = verdict {
                    error!(smesher = %node, error = %err, "initial post is invalid");
                    self.local_store.remove_initial_post(node)?;
                    return Err(ActivationError::InvalidInitialPost(err));
                }
                NipostChallenge {
                    publish_epoch: current.next(),
                    sequence: 0,
                    prev_atx_id: AtxId::EMPTY,
                    positioning_atx,
                    commitment_atx: Some(initial.commitment_atx),
                    initial_post: Some(initial.post),
                }
            }
            Some(prev) => NipostChallenge {
                publish_epoch: current.next(),
                sequence: prev.sequence + 1,
                prev_atx_id: prev.id,
                positioning_atx,
                commitment_atx: None,
                initial_post: None,
            },
        };

        self.local_store.add_challenge(node, &challenge)?;
        Ok(challenge)
    }

    async fn positioning_atx(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
    ) -> Result<AtxId, ActivationError> {
        let opts = VerifyChainOpts {
            assume_valid_before: self
                .clock
                .now()
                .checked_sub(self.config.post_validity_delay),
            trusted_node: Some(*node),
        };
        let mut selector =
            PositioningSelector::new(&*self.atxs, &*self.validator, self.config.golden_atx);
        match selector.select(cancel, node, &opts).await? {
            Some(id) => Ok(id),
            None => {
                info!(smesher = %node, "using golden atx as positioning atx");
                Ok(self.config.golden_atx)
            }
        }
    }
}

/// When to start building a challenge for a round starting at
/// `round_start`: one grace period early, plus a small random jitter.
pub(crate) fn challenge_build_start(round_start: SystemTime, grace_period: Duration) -> SystemTime {
    let max_jitter = grace_period.mul_f64(MAX_CHALLENGE_BUILD_JITTER_PERCENT / 100.0);
    let jitter = if max_jitter.is_zero() {
        Duration::ZERO
    } else {
        rand::thread_rng().gen_range(Duration::ZERO..max_jitter)
    };
    let start = round_start + jitter;
    start.checked_sub(grace_period).unwrap_or(start)
}
