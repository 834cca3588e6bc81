//! Lifecycle manager.
//!
//! The [`Builder`] owns the registered identities and starts one control
//! loop (plus an optional re-broadcast task) per identity while smeshing.
//! Start, stop and register are serialized by one async lifecycle mutex;
//! the loops themselves share a [`BuilderContext`].

use crate::config::{BuilderConfig, PoetConfig};
use crate::error::{BuilderError, ResetFailure};
use crate::nipost::NipostBuilder;
use crate::states::{CycleStages, PostStates};
use crate::ActivationError;
use parking_lot::{Mutex, RwLock};
use smesher_core::{AtxProvider, AtxSyncer, LayerClock, NipostValidator, Publisher};
use smesher_storage::LocalStore;
use smesher_types::{
    ActivationTx, Address, CycleStage, EdSigner, NipostChallenge, NodeId, PostState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Collaborators of the builder.
#[derive(Clone)]
pub struct BuilderDeps {
    pub local_store: Arc<dyn LocalStore>,
    pub atxs: Arc<dyn AtxProvider>,
    pub publisher: Arc<dyn Publisher>,
    pub nipost_builder: Arc<dyn NipostBuilder>,
    pub validator: Arc<dyn NipostValidator>,
    pub clock: Arc<dyn LayerClock>,
    pub syncer: Arc<dyn AtxSyncer>,
    /// Shared with the NIPoST builder, which marks identities as proving.
    pub post_states: Arc<PostStates>,
}

/// State shared by all control loops.
pub(crate) struct BuilderContext {
    pub(crate) config: BuilderConfig,
    pub(crate) poet_config: PoetConfig,
    pub(crate) local_store: Arc<dyn LocalStore>,
    pub(crate) atxs: Arc<dyn AtxProvider>,
    pub(crate) publisher: Arc<dyn Publisher>,
    pub(crate) nipost_builder: Arc<dyn NipostBuilder>,
    pub(crate) validator: Arc<dyn NipostValidator>,
    pub(crate) clock: Arc<dyn LayerClock>,
    pub(crate) syncer: Arc<dyn AtxSyncer>,
    pub(crate) post_states: Arc<PostStates>,
    pub(crate) stages: CycleStages,
    coinbase: RwLock<Address>,
}

impl BuilderContext {
    pub(crate) fn coinbase(&self) -> Address {
        *self.coinbase.read()
    }

    fn set_coinbase(&self, coinbase: Address) {
        *self.coinbase.write() = coinbase;
    }

    async fn regossip_loop(self: Arc<Self>, cancel: CancellationToken, node: NodeId) {
        let interval = self.config.regossip_interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(err) = self.regossip(&node).await {
                        warn!(smesher = %node, error = %err, "failed to re-gossip");
                    }
                }
            }
        }
    }
}

struct Running {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

/// Produces ATXs for every registered identity while smeshing.
pub struct Builder {
    ctx: Arc<BuilderContext>,
    parent: CancellationToken,
    lifecycle: tokio::sync::Mutex<()>,
    signers: Mutex<HashMap<NodeId, Arc<EdSigner>>>,
    running: Mutex<Option<Running>>,
}

impl Builder {
    pub fn new(config: BuilderConfig, poet_config: PoetConfig, deps: BuilderDeps) -> Self {
        let ctx = BuilderContext {
            config,
            poet_config,
            local_store: deps.local_store,
            atxs: deps.atxs,
            publisher: deps.publisher,
            nipost_builder: deps.nipost_builder,
            validator: deps.validator,
            clock: deps.clock,
            syncer: deps.syncer,
            post_states: deps.post_states,
            stages: CycleStages::new(),
            coinbase: RwLock::new(Address::default()),
        };
        Self {
            ctx: Arc::new(ctx),
            parent: CancellationToken::new(),
            lifecycle: tokio::sync::Mutex::new(()),
            signers: Mutex::new(HashMap::new()),
            running: Mutex::new(None),
        }
    }

    /// Derive smeshing cancellation from `parent`.
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        self.parent = parent;
        self
    }

    /// Add an identity. If smeshing, its control loop starts immediately.
    pub async fn register(&self, signer: EdSigner) {
        let _lifecycle = self.lifecycle.lock().await;
        let node = signer.node_id();
        let signer = Arc::new(signer);
        {
            let mut signers = self.signers.lock();
            if signers.contains_key(&node) {
                error!(smesher = %node, "signing key already registered");
                return;
            }
            signers.insert(node, signer.clone());
        }

        info!(smesher = %node, "registered signing key");
        self.ctx.post_states.set(node, PostState::Idle);
        if let Some(running) = self.running.lock().as_ref() {
            self.start_identity(running, signer);
        }
    }

    pub async fn start_smeshing(&self, coinbase: Address) -> Result<(), BuilderError> {
        let _lifecycle = self.lifecycle.lock().await;
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(BuilderError::AlreadyStarted);
        }

        self.ctx.set_coinbase(coinbase);
        let state = Running {
            cancel: self.parent.child_token(),
            tracker: TaskTracker::new(),
        };
        let signers: Vec<Arc<EdSigner>> = self.signers.lock().values().cloned().collect();
        for signer in signers {
            self.start_identity(&state, signer);
        }
        *running = Some(state);
        info!(coinbase = %coinbase, "smeshing started");
        Ok(())
    }

    /// Stop all control loops and wait for them to exit. With `reset`, every
    /// identity's proving progress and challenge are discarded; failures are
    /// collected and returned together.
    pub async fn stop_smeshing(&self, reset: bool) -> Result<(), BuilderError> {
        let _lifecycle = self.lifecycle.lock().await;
        let running = self.running.lock().take();
        let Some(running) = running else {
            return Err(BuilderError::NotStarted);
        };

        running.cancel.cancel();
        running.tracker.close();
        running.tracker.wait().await;
        info!("smeshing stopped");

        if !reset {
            return Ok(());
        }

        let nodes: Vec<NodeId> = self.signers.lock().keys().copied().collect();
        let mut failures = Vec::new();
        for node in nodes {
            self.ctx.post_states.set(node, PostState::Idle);
            if let Err(err) = self.ctx.nipost_builder.reset_state(&node) {
                error!(smesher = %node, error = %err, "failed to reset builder state");
                failures.push(ResetFailure { node, error: err });
                continue;
            }
            if let Err(err) = self.ctx.local_store.remove_challenge(&node) {
                error!(smesher = %node, error = %err, "failed to remove nipost challenge");
                failures.push(ResetFailure { node, error: err });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BuilderError::Reset(failures))
        }
    }

    fn start_identity(&self, running: &Running, signer: Arc<EdSigner>) {
        let node = signer.node_id();
        running
            .tracker
            .spawn(self.ctx.clone().run(running.cancel.clone(), signer));
        if self.ctx.config.regossip_interval.is_zero() {
            return;
        }
        running
            .tracker
            .spawn(self.ctx.clone().regossip_loop(running.cancel.clone(), node));
    }

    pub fn is_smeshing(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn coinbase(&self) -> Address {
        self.ctx.coinbase()
    }

    pub fn set_coinbase(&self, coinbase: Address) {
        self.ctx.set_coinbase(coinbase);
    }

    pub fn smesher_ids(&self) -> Vec<NodeId> {
        self.signers.lock().keys().copied().collect()
    }

    /// PoST state of every registered identity.
    pub fn post_states(&self) -> HashMap<NodeId, PostState> {
        let signers = self.signers.lock();
        self.ctx
            .post_states
            .snapshot()
            .into_iter()
            .filter(|(node, _)| signers.contains_key(node))
            .collect()
    }

    /// Control loop stage of every identity that has run.
    pub fn cycle_stages(&self) -> HashMap<NodeId, CycleStage> {
        self.ctx.stages.snapshot()
    }

    /// Return the identity's fresh challenge or build a new one.
    pub async fn build_nipost_challenge(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
    ) -> Result<NipostChallenge, ActivationError> {
        self.ctx.build_nipost_challenge(cancel, node).await
    }

    /// Run a single proving cycle for `signer` and publish its ATX.
    pub async fn publish_activation_tx(
        &self,
        cancel: &CancellationToken,
        signer: &EdSigner,
    ) -> Result<ActivationTx, ActivationError> {
        self.ctx.publish_activation_tx(cancel, signer).await
    }

    /// Ensure `node` has an initial post.
    pub async fn build_initial_post(
        &self,
        cancel: &CancellationToken,
        node: &NodeId,
    ) -> Result<(), ActivationError> {
        self.ctx.build_initial_post(cancel, node).await
    }

    /// Re-publish `node`'s ATX of the current epoch.
    pub async fn regossip(&self, node: &NodeId) -> Result<(), ActivationError> {
        self.ctx.regossip(node).await
    }
}
