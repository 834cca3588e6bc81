//! Domain-specific identifier types.

use crate::Hash;
use sbor::prelude::*;
use std::fmt;

/// Smesher identity (the ed25519 public key of its signer).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First five bytes as hex, for log lines.
    pub fn short_string(&self) -> String {
        hex::encode(&self.0[..5])
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_string())
    }
}

/// Activation transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, BasicSbor)]
#[sbor(transparent)]
pub struct AtxId(pub Hash);

impl AtxId {
    /// Sentinel for "no previous ATX" (all zero bytes).
    pub const EMPTY: Self = AtxId(Hash::ZERO);

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// First five bytes as hex, for log lines.
    pub fn short_string(&self) -> String {
        self.0.short_string()
    }
}

impl fmt::Debug for AtxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtxId({})", self.short_string())
    }
}

impl fmt::Display for AtxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_string())
    }
}

/// Protocol epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BasicSbor)]
#[sbor(transparent)]
pub struct EpochId(pub u32);

impl EpochId {
    /// The next epoch.
    pub fn next(self) -> Self {
        EpochId(self.0 + 1)
    }

    /// The previous epoch (saturating at genesis).
    pub fn prev(self) -> Self {
        EpochId(self.0.saturating_sub(1))
    }

    /// First layer of this epoch.
    pub fn first_layer(self, layers_per_epoch: u32) -> LayerId {
        LayerId(self.0 * layers_per_epoch)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol layer. An epoch spans `layers_per_epoch` layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BasicSbor)]
#[sbor(transparent)]
pub struct LayerId(pub u32);

impl LayerId {
    /// The next layer.
    pub fn next(self) -> Self {
        LayerId(self.0 + 1)
    }

    /// Epoch containing this layer.
    pub fn epoch(self, layers_per_epoch: u32) -> EpochId {
        EpochId(self.0 / layers_per_epoch)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coinbase (reward) address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BasicSbor)]
#[sbor(transparent)]
pub struct Address(pub [u8; 24]);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Per-identity VRF nonce found during PoST initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
#[sbor(transparent)]
pub struct VrfNonce(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_epoch_mapping() {
        let lpe = 10;
        assert_eq!(LayerId(0).epoch(lpe), EpochId(0));
        assert_eq!(LayerId(9).epoch(lpe), EpochId(0));
        assert_eq!(LayerId(10).epoch(lpe), EpochId(1));
        assert_eq!(EpochId(3).first_layer(lpe), LayerId(30));
        assert_eq!(EpochId(3).first_layer(lpe).epoch(lpe), EpochId(3));
    }

    #[test]
    fn test_epoch_prev_saturates() {
        assert_eq!(EpochId(0).prev(), EpochId(0));
        assert_eq!(EpochId(4).prev(), EpochId(3));
        assert_eq!(EpochId(4).next(), EpochId(5));
    }

    #[test]
    fn test_empty_atx_id() {
        assert!(AtxId::EMPTY.is_empty());
        assert!(!AtxId(Hash::from_bytes(b"atx")).is_empty());
    }
}
