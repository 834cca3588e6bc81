//! NIPoST construction.
//!
//! A NIPoST is built in three persisted phases:
//!
//! | Phase | Work | Recorded as |
//! |-------|------|-------------|
//! | 0 | submit the challenge to every PoET service before the round starts | `Registered` |
//! | 1 | after the round ends, fetch proofs and keep the best one containing the challenge | `ProofObtained` |
//! | 2 | execute the PoST against the PoET proof | `ProofExecuted` |
//!
//! Progress is written once per phase, so a restarted builder resumes at the
//! first phase that was not recorded.

use crate::config::PoetConfig;
use crate::states::PostStates;
use crate::wait::{cancellable, sleep, sleep_until};
use crate::ActivationError;
use async_trait::async_trait;
use futures::future::join_all;
use smesher_core::{LayerClock, PoetClient, PoetError, PostError, PostProver};
use smesher_storage::{LocalStore, ProvingProgress, StorageError};
use smesher_types::{
    membership_proof, Domain, EdSigner, EpochId, Hash, MerkleProof, NIPost, NipostChallenge,
    NipostState, NodeId, PoetProofRef, PoetRegistration, Post, PostInfo, PostMetadata, PostState,
    Signature,
};
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builds NIPoSTs and initial PoSTs for the control loops.
#[async_trait]
pub trait NipostBuilder: Send + Sync {
    /// Run (or resume) every proving phase for `challenge`.
    async fn build_nipost(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
        challenge: &NipostChallenge,
    ) -> Result<NipostState, ActivationError>;

    /// Generate a single PoST for `challenge`.
    async fn proof(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
        challenge: &[u8],
    ) -> Result<(Post, PostInfo), ActivationError>;

    /// Forget all proving progress of `node`.
    fn reset_state(&self, node: &NodeId) -> Result<(), StorageError>;
}

/// [`NipostBuilder`] over a set of PoET services and a PoST prover, with
/// progress kept in a [`LocalStore`].
pub struct NipostProofBuilder {
    store: Arc<dyn LocalStore>,
    poets: Vec<Arc<dyn PoetClient>>,
    prover: Arc<dyn PostProver>,
    clock: Arc<dyn LayerClock>,
    config: PoetConfig,
    post_states: Arc<PostStates>,
}

impl NipostProofBuilder {
    pub fn new(
        store: Arc<dyn LocalStore>,
        poets: Vec<Arc<dyn PoetClient>>,
        prover: Arc<dyn PostProver>,
        clock: Arc<dyn LayerClock>,
        config: PoetConfig,
        post_states: Arc<PostStates>,
    ) -> Self {
        Self {
            store,
            poets,
            prover,
            clock,
            config,
            post_states,
        }
    }

    fn poet_round_start(&self, epoch: EpochId) -> SystemTime {
        self.clock.epoch_to_time(epoch) + self.config.phase_shift
    }

    fn poet_round_end(&self, epoch: EpochId) -> SystemTime {
        let end = self.clock.epoch_to_time(epoch.next()) + self.config.phase_shift;
        end.checked_sub(self.config.cycle_gap).unwrap_or(end)
    }

    /// Phase 0: register the challenge with every PoET service.
    async fn register(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
        challenge: &NipostChallenge,
        challenge_hash: Hash,
    ) -> Result<ProvingProgress, ActivationError> {
        let node = signer.node_id();
        let round_start = self.poet_round_start(challenge.publish_epoch.prev());
        if self.clock.now() >= round_start {
            return Err(ActivationError::ChallengeExpired(format!(
                "poet round for publish epoch {} already started",
                challenge.publish_epoch
            )));
        }

        let signature = signer.sign(Domain::Poet, challenge_hash.as_bytes());
        let registrations = self
            .submit_all(cancel, round_start, &challenge_hash, &signature, &node)
            .await?;
        if registrations.is_empty() {
            return Err(ActivationError::PoetServiceUnstable(
                "failed to register in any poet".to_string(),
            ));
        }

        info!(
            smesher = %node,
            poets = registrations.len(),
            publish_epoch = %challenge.publish_epoch,
            "challenge registered in poets"
        );
        Ok(ProvingProgress::Registered {
            challenge: challenge_hash,
            registrations,
        })
    }

    async fn submit_all(
        &self,
        cancel: &CancellationToken,
        deadline: SystemTime,
        challenge_hash: &Hash,
        signature: &Signature,
        node: &NodeId,
    ) -> Result<Vec<PoetRegistration>, ActivationError> {
        let submissions = self.poets.iter().map(|poet| async move {
            let round = self
                .request(cancel, Some(deadline), || {
                    poet.submit(deadline, challenge_hash, signature, node)
                })
                .await;
            (poet.address().to_string(), round)
        });

        let mut registrations = Vec::new();
        for (address, round) in join_all(submissions).await {
            match round {
                Ok(round) => registrations.push(PoetRegistration {
                    address,
                    challenge_hash: *challenge_hash,
                    round_id: round.id,
                    round_end: round.end,
                }),
                Err(ActivationError::Canceled) => return Err(ActivationError::Canceled),
                Err(err) => {
                    warn!(smesher = %node, poet = %address, error = %err, "failed to submit challenge to poet")
                }
            }
        }
        Ok(registrations)
    }

    /// Phase 1: wait for the rounds to end and pick the best proof.
    async fn fetch_proof(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
        challenge: &NipostChallenge,
        challenge_hash: Hash,
        registrations: &[PoetRegistration],
    ) -> Result<ProvingProgress, ActivationError> {
        let rounds_end = registrations
            .iter()
            .map(|r| r.round_end)
            .max()
            .unwrap_or_else(|| self.poet_round_end(challenge.publish_epoch.prev()));
        debug!(smesher = %node, "waiting for poet rounds to end");
        sleep_until(cancel, &*self.clock, rounds_end).await?;

        let publish_end = self.clock.epoch_to_time(challenge.target_epoch());
        if self.clock.now() >= publish_end {
            return Err(ActivationError::ChallengeExpired(
                "deadline to query poet proofs passed".to_string(),
            ));
        }

        let queries = registrations.iter().map(|registration| async move {
            let proof = self.query_proof(cancel, registration, &challenge_hash).await;
            (registration.address.as_str(), proof)
        });

        let mut best: Option<(PoetProofRef, MerkleProof, u64)> = None;
        for (address, proof) in join_all(queries).await {
            match proof {
                Ok(Some((reference, membership, leaf_count))) => {
                    if best.as_ref().map_or(true, |(_, _, leaves)| leaf_count > *leaves) {
                        best = Some((reference, membership, leaf_count));
                    }
                }
                Ok(None) => {
                    warn!(smesher = %node, poet = %address, "poet proof does not include our challenge")
                }
                Err(ActivationError::Canceled) => return Err(ActivationError::Canceled),
                Err(err) => {
                    warn!(smesher = %node, poet = %address, error = %err, "failed to get poet proof")
                }
            }
        }

        let Some((proof, membership, leaf_count)) = best else {
            return Err(ActivationError::PoetServiceUnstable(
                "no poet proof including the challenge".to_string(),
            ));
        };
        info!(smesher = %node, proof = %proof, leaf_count, "selected poet proof");
        Ok(ProvingProgress::ProofObtained {
            challenge: challenge_hash,
            proof,
            membership,
            leaf_count,
        })
    }

    async fn query_proof(
        &self,
        cancel: &CancellationToken,
        registration: &PoetRegistration,
        challenge_hash: &Hash,
    ) -> Result<Option<(PoetProofRef, MerkleProof, u64)>, ActivationError> {
        let Some(poet) = self
            .poets
            .iter()
            .find(|p| p.address() == registration.address)
        else {
            return Err(ActivationError::Poet(PoetError::Unavailable {
                address: registration.address.clone(),
                reason: "poet no longer configured".to_string(),
            }));
        };

        let (proof, members) = self
            .request(cancel, None, || poet.proof(&registration.round_id))
            .await?;
        let Some(index) = members.iter().position(|m| m == challenge_hash) else {
            return Ok(None);
        };
        let Some((root, membership)) = membership_proof(&members, index) else {
            return Ok(None);
        };
        if root != proof.members_root {
            return Err(ActivationError::Poet(PoetError::Rejected(format!(
                "member root mismatch in round {}",
                proof.round_id
            ))));
        }
        Ok(Some((proof.reference(), membership, proof.leaf_count)))
    }

    /// Phase 2: execute the PoST against the PoET proof.
    async fn execute_post(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
        challenge: &NipostChallenge,
        challenge_hash: Hash,
        proof: PoetProofRef,
        membership: MerkleProof,
    ) -> Result<ProvingProgress, ActivationError> {
        let publish_end = self.clock.epoch_to_time(challenge.target_epoch());
        if self.clock.now() >= publish_end {
            return Err(ActivationError::ChallengeExpired(
                "deadline to publish atx passed".to_string(),
            ));
        }

        info!(smesher = %node, proof = %proof, "starting post execution");
        let started = Instant::now();
        let (post, post_info) = self.proof(cancel, node, proof.as_bytes()).await?;
        let vrf_nonce = post_info
            .nonce
            .ok_or_else(|| PostError::Failed("prover returned no vrf nonce".to_string()))?;
        info!(smesher = %node, post_duration = ?started.elapsed(), "finished post execution");

        Ok(ProvingProgress::ProofExecuted {
            challenge: challenge_hash,
            proof,
            membership,
            post,
            metadata: PostMetadata {
                challenge: proof.as_bytes().to_vec(),
                labels_per_unit: post_info.labels_per_unit,
            },
            num_units: post_info.num_units,
            vrf_nonce,
        })
    }

    /// One PoET request under the request policy: per-attempt timeout,
    /// bounded retries with a fixed delay, and an optional hard deadline.
    async fn request<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        deadline: Option<SystemTime>,
        mut op: F,
    ) -> Result<T, ActivationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PoetError>>,
    {
        let mut attempt = 0;
        loop {
            let mut timeout = self.config.request_timeout;
            if let Some(deadline) = deadline {
                let remaining = deadline.duration_since(self.clock.now()).unwrap_or_default();
                if remaining.is_zero() {
                    return Err(ActivationError::Poet(PoetError::Timeout));
                }
                timeout = timeout.min(remaining);
            }

            let outcome = cancellable(cancel, tokio::time::timeout(timeout, op())).await?;
            let err = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => PoetError::Timeout,
            };

            attempt += 1;
            if attempt > self.config.max_request_retries {
                return Err(ActivationError::Poet(err));
            }
            debug!(attempt, error = %err, "poet request failed, retrying");
            sleep(cancel, self.config.request_retry_delay).await?;
        }
    }
}

#[async_trait]
impl NipostBuilder for NipostProofBuilder {
    async fn build_nipost(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
        challenge: &NipostChallenge,
    ) -> Result<NipostState, ActivationError> {
        let node = signer.node_id();
        let challenge_hash = challenge.hash();

        let mut progress = self.store.proving_progress(&node)?;
        if let Some(recorded) = progress.challenge() {
            if recorded != challenge_hash {
                warn!(
                    smesher = %node,
                    recorded = %recorded,
                    current = %challenge_hash,
                    "proving progress belongs to another challenge, resetting"
                );
                self.store.reset_progress(&node)?;
                progress = ProvingProgress::NotStarted;
            }
        }

        loop {
            progress = match progress {
                ProvingProgress::NotStarted => {
                    self.register(cancel, signer, challenge, challenge_hash).await?
                }
                ProvingProgress::Registered { registrations, .. } => {
                    self.fetch_proof(cancel, &node, challenge, challenge_hash, &registrations)
                        .await?
                }
                ProvingProgress::ProofObtained {
                    proof, membership, ..
                } => {
                    self.execute_post(cancel, &node, challenge, challenge_hash, proof, membership)
                        .await?
                }
                ProvingProgress::ProofExecuted {
                    membership,
                    post,
                    metadata,
                    num_units,
                    vrf_nonce,
                    ..
                } => {
                    return Ok(NipostState {
                        nipost: NIPost {
                            membership,
                            post,
                            post_metadata: metadata,
                        },
                        num_units,
                        vrf_nonce,
                    });
                }
            };
            self.store.advance_progress(&node, &progress)?;
        }
    }

    async fn proof(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
        challenge: &[u8],
    ) -> Result<(Post, PostInfo), ActivationError> {
        self.post_states.set(*node, PostState::Proving);
        let result = cancellable(cancel, self.prover.proof(node, challenge)).await;
        self.post_states.set(*node, PostState::Idle);
        Ok(result??)
    }

    fn reset_state(&self, node: &NodeId) -> Result<(), StorageError> {
        self.store.reset_progress(node)
    }
}
