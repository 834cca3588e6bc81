//! Builder and PoET timing configuration.

use smesher_types::AtxId;
use std::time::Duration;

/// Timing of PoET rounds relative to epochs, and the request policy for
/// talking to PoET services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetConfig {
    /// Offset of a PoET round start from the epoch start.
    pub phase_shift: Duration,

    /// Gap between the end of one round and the start of the next.
    pub cycle_gap: Duration,

    /// How long before a round starts the challenge is built.
    pub grace_period: Duration,

    /// Timeout of a single PoET request.
    pub request_timeout: Duration,

    /// Pause between retries of a failed PoET request.
    pub request_retry_delay: Duration,

    /// Retries of a failed PoET request before giving up on that service.
    pub max_request_retries: usize,
}

impl Default for PoetConfig {
    fn default() -> Self {
        Self {
            phase_shift: Duration::ZERO,
            cycle_gap: Duration::ZERO,
            grace_period: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            request_retry_delay: Duration::from_millis(400),
            max_request_retries: 10,
        }
    }
}

impl PoetConfig {
    pub fn with_phase_shift(mut self, phase_shift: Duration) -> Self {
        self.phase_shift = phase_shift;
        self
    }

    pub fn with_cycle_gap(mut self, cycle_gap: Duration) -> Self {
        self.cycle_gap = cycle_gap;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Maximum jitter added before building a challenge, as a percentage of the
/// grace period.
pub const MAX_CHALLENGE_BUILD_JITTER_PERCENT: f64 = 1.0;

/// Configuration of the ATX builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Golden ATX: the genesis anchor and commitment fallback.
    pub golden_atx: AtxId,

    /// Labels per storage unit used to re-validate the initial PoST.
    pub labels_per_unit: u64,

    /// Interval at which the current epoch's ATX is re-broadcast.
    /// Zero disables re-broadcasting.
    pub regossip_interval: Duration,

    /// Wait after a PoET service failure before retrying the cycle.
    pub poet_retry_interval: Duration,

    /// ATXs received longer ago than this are assumed to carry a valid PoST
    /// when validating positioning chains.
    pub post_validity_delay: Duration,

    /// Pause between broadcast attempts of a built ATX.
    pub broadcast_retry_delay: Duration,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            golden_atx: AtxId::EMPTY,
            labels_per_unit: 1024,
            regossip_interval: Duration::ZERO,
            poet_retry_interval: Duration::from_secs(5),
            post_validity_delay: Duration::from_secs(12 * 60 * 60),
            broadcast_retry_delay: Duration::from_millis(100),
        }
    }
}

impl BuilderConfig {
    pub fn new(golden_atx: AtxId, labels_per_unit: u64) -> Self {
        Self {
            golden_atx,
            labels_per_unit,
            ..Default::default()
        }
    }

    pub fn with_regossip_interval(mut self, interval: Duration) -> Self {
        self.regossip_interval = interval;
        self
    }

    pub fn with_poet_retry_interval(mut self, interval: Duration) -> Self {
        self.poet_retry_interval = interval;
        self
    }

    pub fn with_post_validity_delay(mut self, delay: Duration) -> Self {
        self.post_validity_delay = delay;
        self
    }

    pub fn with_broadcast_retry_delay(mut self, delay: Duration) -> Self {
        self.broadcast_retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let poet = PoetConfig::default();
        assert_eq!(poet.request_retry_delay, Duration::from_millis(400));
        assert_eq!(poet.max_request_retries, 10);

        let builder = BuilderConfig::default();
        assert_eq!(builder.poet_retry_interval, Duration::from_secs(5));
        assert_eq!(builder.post_validity_delay, Duration::from_secs(43_200));
        assert!(builder.regossip_interval.is_zero());
    }
}
