//! Layer clock.

use async_trait::async_trait;
use smesher_types::{EpochId, LayerId};
use std::time::SystemTime;

/// Maps layers to wall-clock time.
#[async_trait]
pub trait LayerClock: Send + Sync {
    /// The layer in progress now.
    fn current_layer(&self) -> LayerId;

    fn layers_per_epoch(&self) -> u32;

    /// Start time of `layer`.
    fn layer_to_time(&self, layer: LayerId) -> SystemTime;

    /// Current wall-clock time as seen by this clock.
    fn now(&self) -> SystemTime;

    /// Resolve once `layer` has started. Returns immediately for past layers.
    async fn await_layer(&self, layer: LayerId);

    fn current_epoch(&self) -> EpochId {
        self.current_layer().epoch(self.layers_per_epoch())
    }

    /// Start time of the first layer of `epoch`.
    fn epoch_to_time(&self, epoch: EpochId) -> SystemTime {
        self.layer_to_time(epoch.first_layer(self.layers_per_epoch()))
    }
}
