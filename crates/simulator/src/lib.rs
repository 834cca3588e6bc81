//! Smesher simulator.
//!
//! Runs a set of identities through full proving cycles against simulated
//! PoET services, PoST prover, validator and gossip network, all on tokio's
//! virtual clock.
//!
//! # Example
//!
//! ```ignore
//! use smesher_simulator::{SimulationRunner, SimulatorConfig};
//! use smesher_storage::MemoryLocalStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::default().with_identities(3);
//! let runner = SimulationRunner::new(config, Arc::new(MemoryLocalStore::new())).await?;
//! let report = runner.run_for(Duration::from_secs(600)).await?;
//! report.print();
//! ```

pub mod config;
pub mod runner;

pub use config::{ConfigError, SimulatorConfig};
pub use runner::{IdentityReport, SimulationReport, SimulationRunner};
