//! Configuration types for the simulator.

use serde::Deserialize;
use smesher_activation::{BuilderConfig, PoetConfig};
use smesher_types::AtxId;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a simulator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a simulation run.
///
/// Loaded from TOML; every field is optional and falls back to
/// [`SimulatorConfig::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of smeshing identities.
    pub identities: u32,

    /// Seed for identity keys and network loss.
    pub seed: u64,

    pub layer_duration_secs: u64,
    pub layers_per_epoch: u32,

    /// Number of PoET services. Service `i` reports `poet_leaf_count + i`
    /// leaves per round.
    pub poets: u32,
    pub poet_leaf_count: u64,
    pub phase_shift_secs: u64,
    pub cycle_gap_secs: u64,
    pub grace_period_secs: u64,

    pub num_units: u32,
    pub labels_per_unit: u64,

    /// Zero disables re-broadcasting.
    pub regossip_interval_secs: u64,

    /// Probability that a single publish attempt is dropped.
    pub publish_loss_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            identities: 2,
            seed: 12345,
            layer_duration_secs: 10,
            layers_per_epoch: 10,
            poets: 2,
            poet_leaf_count: 100,
            phase_shift_secs: 50,
            cycle_gap_secs: 20,
            grace_period_secs: 10,
            num_units: 4,
            labels_per_unit: 1024,
            regossip_interval_secs: 0,
            publish_loss_rate: 0.0,
        }
    }
}

impl SimulatorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn with_identities(mut self, identities: u32) -> Self {
        self.identities = identities;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_publish_loss_rate(mut self, rate: f64) -> Self {
        self.publish_loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_regossip_interval(mut self, interval: Duration) -> Self {
        self.regossip_interval_secs = interval.as_secs();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identities == 0 {
            return Err(ConfigError::Invalid("identities must be positive".into()));
        }
        if self.layer_duration_secs == 0 || self.layers_per_epoch == 0 {
            return Err(ConfigError::Invalid(
                "layer duration and layers per epoch must be positive".into(),
            ));
        }
        if self.poets == 0 {
            return Err(ConfigError::Invalid("at least one poet is required".into()));
        }
        if self.phase_shift() >= self.epoch_duration() || self.cycle_gap() >= self.epoch_duration()
        {
            return Err(ConfigError::Invalid(
                "phase shift and cycle gap must be shorter than an epoch".into(),
            ));
        }
        if self.grace_period() > self.phase_shift() {
            return Err(ConfigError::Invalid(
                "grace period must not exceed the phase shift".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.publish_loss_rate) {
            return Err(ConfigError::Invalid(
                "publish loss rate must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }

    pub fn layer_duration(&self) -> Duration {
        Duration::from_secs(self.layer_duration_secs)
    }

    pub fn epoch_duration(&self) -> Duration {
        self.layer_duration() * self.layers_per_epoch
    }

    pub fn phase_shift(&self) -> Duration {
        Duration::from_secs(self.phase_shift_secs)
    }

    pub fn cycle_gap(&self) -> Duration {
        Duration::from_secs(self.cycle_gap_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn poet_config(&self) -> PoetConfig {
        PoetConfig::default()
            .with_phase_shift(self.phase_shift())
            .with_cycle_gap(self.cycle_gap())
            .with_grace_period(self.grace_period())
    }

    pub fn builder_config(&self, golden_atx: AtxId) -> BuilderConfig {
        BuilderConfig::new(golden_atx, self.labels_per_unit)
            .with_regossip_interval(Duration::from_secs(self.regossip_interval_secs))
    }
}
