//! Wires simulated collaborators to a [`Builder`] and runs it.

use crate::config::{ConfigError, SimulatorConfig};
use smesher_activation::{Builder, BuilderDeps, BuilderError, NipostProofBuilder, PostStates};
use smesher_core::{LayerClock, PoetClient};
use smesher_simulation::{
    MemoryAtxStore, SimClock, SimNetwork, SimPoet, SimPostProver, SimSyncer, SimValidator,
};
use smesher_storage::LocalStore;
use smesher_types::{Address, AtxHeader, AtxId, EdSigner, EpochId, Hash, LayerId, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Coinbase every simulated identity is rewarded to.
const SIM_COINBASE: Address = Address([0xAA; 24]);

/// ATXs one identity published during a run.
#[derive(Debug, Clone)]
pub struct IdentityReport {
    pub node: NodeId,
    /// Oldest first.
    pub atxs: Vec<AtxHeader>,
}

/// Outcome of [`SimulationRunner::run_for`].
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Simulated time covered by the run.
    pub duration: Duration,
    /// Epoch the clock stood in when the run ended.
    pub final_epoch: EpochId,
    pub identities: Vec<IdentityReport>,
    /// Publish attempts on the network, including re-broadcasts and
    /// dropped attempts.
    pub broadcast_attempts: usize,
}

impl SimulationReport {
    pub fn total_atxs(&self) -> usize {
        self.identities.iter().map(|i| i.atxs.len()).sum()
    }

    pub fn print(&self) {
        println!("simulated {:?}, ended in epoch {}", self.duration, self.final_epoch);
        println!(
            "{} atxs published, {} broadcast attempts",
            self.total_atxs(),
            self.broadcast_attempts
        );
        for identity in &self.identities {
            let epochs: Vec<String> = identity
                .atxs
                .iter()
                .map(|a| a.publish_epoch.to_string())
                .collect();
            println!(
                "  {}: {} atxs, publish epochs [{}]",
                identity.node,
                identity.atxs.len(),
                epochs.join(", ")
            );
        }
    }
}

/// A builder smeshing for several identities against simulated PoET
/// services, prover, validator and network.
///
/// Must run inside a tokio runtime; with a paused clock whole epochs pass in
/// moments of real time.
pub struct SimulationRunner {
    config: SimulatorConfig,
    clock: Arc<SimClock>,
    atxs: Arc<MemoryAtxStore>,
    network: Arc<SimNetwork>,
    builder: Builder,
    nodes: Vec<NodeId>,
}

impl SimulationRunner {
    /// Build the simulated network and register every identity.
    pub async fn new(
        config: SimulatorConfig,
        local_store: Arc<dyn LocalStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.to_le_bytes();
        let golden = AtxId(Hash::from_parts(&[b"golden", &seed]));

        let clock = Arc::new(SimClock::new(
            config.layer_duration(),
            config.layers_per_epoch,
            LayerId(0),
        ));
        let atxs = Arc::new(MemoryAtxStore::new());
        let network = Arc::new(
            SimNetwork::new()
                .with_store(atxs.clone(), config.poet_leaf_count)
                .with_loss(config.publish_loss_rate, config.seed),
        );
        let poets: Vec<Arc<dyn PoetClient>> = (0..config.poets)
            .map(|i| {
                Arc::new(SimPoet::new(
                    format!("poet-{}", i),
                    clock.clone(),
                    config.phase_shift(),
                    config.cycle_gap(),
                    config.poet_leaf_count + u64::from(i),
                )) as Arc<dyn PoetClient>
            })
            .collect();
        let prover = Arc::new(SimPostProver::new(
            golden,
            config.num_units,
            config.labels_per_unit,
        ));
        let post_states = Arc::new(PostStates::new());
        let nipost_builder = Arc::new(NipostProofBuilder::new(
            local_store.clone(),
            poets,
            prover,
            clock.clone(),
            config.poet_config(),
            post_states.clone(),
        ));

        let deps = BuilderDeps {
            local_store,
            atxs: atxs.clone(),
            publisher: network.clone(),
            nipost_builder,
            validator: Arc::new(SimValidator::new().with_store(atxs.clone())),
            clock: clock.clone(),
            syncer: Arc::new(SimSyncer::new(true)),
            post_states,
        };
        let builder = Builder::new(config.builder_config(golden), config.poet_config(), deps);

        let mut nodes = Vec::new();
        for index in 0..config.identities {
            let key = Hash::from_parts(&[b"smesher-sim", &seed, &index.to_le_bytes()]);
            let signer = EdSigner::from_seed(key.as_bytes());
            nodes.push(signer.node_id());
            builder.register(signer).await;
        }
        info!(identities = nodes.len(), poets = config.poets, "simulation ready");

        Ok(Self {
            config,
            clock,
            atxs,
            network,
            builder,
            nodes,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Smesh for `duration` of simulated time, then stop and report.
    pub async fn run_for(&self, duration: Duration) -> Result<SimulationReport, BuilderError> {
        self.builder.start_smeshing(SIM_COINBASE).await?;
        tokio::time::sleep(duration).await;
        self.builder.stop_smeshing(false).await?;
        Ok(self.report(duration))
    }

    pub fn report(&self, duration: Duration) -> SimulationReport {
        SimulationReport {
            duration,
            final_epoch: self.clock.current_epoch(),
            identities: self
                .nodes
                .iter()
                .map(|node| IdentityReport {
                    node: *node,
                    atxs: self.atxs.atxs_of(node),
                })
                .collect(),
            broadcast_attempts: self.network.attempts(),
        }
    }
}
