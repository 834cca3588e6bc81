//! Layer clock on tokio time.

use async_trait::async_trait;
use smesher_core::LayerClock;
use smesher_types::LayerId;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Wall-clock time of layer 0.
const GENESIS_SECS: u64 = 1_700_000_000;

/// A [`LayerClock`] that advances with tokio's clock.
///
/// At construction the clock stands at the start of `start_layer`. Under a
/// paused runtime time only moves when every task is idle, which makes layer
/// boundaries exact.
pub struct SimClock {
    genesis: SystemTime,
    layer_duration: Duration,
    layers_per_epoch: u32,
    origin: Instant,
    offset: Duration,
}

impl SimClock {
    pub fn new(layer_duration: Duration, layers_per_epoch: u32, start_layer: LayerId) -> Self {
        Self {
            genesis: SystemTime::UNIX_EPOCH + Duration::from_secs(GENESIS_SECS),
            layer_duration,
            layers_per_epoch,
            origin: Instant::now(),
            offset: layer_duration * start_layer.0,
        }
    }

    pub fn genesis(&self) -> SystemTime {
        self.genesis
    }

    pub fn layer_duration(&self) -> Duration {
        self.layer_duration
    }

    fn since_genesis(&self) -> Duration {
        self.offset + self.origin.elapsed()
    }
}

#[async_trait]
impl LayerClock for SimClock {
    fn current_layer(&self) -> LayerId {
        let layer = self.since_genesis().as_nanos() / self.layer_duration.as_nanos();
        LayerId(layer as u32)
    }

    fn layers_per_epoch(&self) -> u32 {
        self.layers_per_epoch
    }

    fn layer_to_time(&self, layer: LayerId) -> SystemTime {
        self.genesis + self.layer_duration * layer.0
    }

    fn now(&self) -> SystemTime {
        self.genesis + self.since_genesis()
    }

    async fn await_layer(&self, layer: LayerId) {
        if let Ok(wait) = self.layer_to_time(layer).duration_since(self.now()) {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_types::EpochId;

    #[tokio::test(start_paused = true)]
    async fn test_layers_follow_tokio_time() {
        let clock = SimClock::new(Duration::from_secs(10), 5, LayerId(3));
        assert_eq!(clock.current_layer(), LayerId(3));
        assert_eq!(clock.current_epoch(), EpochId(0));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(clock.current_layer(), LayerId(5));
        assert_eq!(clock.current_epoch(), EpochId(1));
        assert_eq!(
            clock.epoch_to_time(EpochId(1)),
            clock.genesis() + Duration::from_secs(50)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_layer() {
        let clock = SimClock::new(Duration::from_secs(10), 5, LayerId(0));

        clock.await_layer(LayerId(7)).await;
        assert_eq!(clock.now(), clock.layer_to_time(LayerId(7)));

        // Past layers resolve at once.
        clock.await_layer(LayerId(2)).await;
        assert_eq!(clock.current_layer(), LayerId(7));
    }
}
