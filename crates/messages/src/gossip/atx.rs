//! Activation transaction gossip message.

use crate::NetworkMessage;
use sbor::prelude::BasicSbor;
use smesher_types::ActivationTx;

/// Gossip protocol for activation transactions.
pub const ATX_PROTOCOL: &str = "ax1";

/// Broadcasts a signed ATX. Encodes exactly as the inner ATX.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct AtxGossip {
    pub atx: ActivationTx,
}

impl AtxGossip {
    pub fn new(atx: ActivationTx) -> Self {
        Self { atx }
    }

    pub fn atx(&self) -> &ActivationTx {
        &self.atx
    }

    pub fn into_atx(self) -> ActivationTx {
        self.atx
    }
}

impl NetworkMessage for AtxGossip {
    fn message_type_id() -> &'static str {
        ATX_PROTOCOL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_test_helpers::{signed_atx, test_signer};

    #[test]
    fn test_gossip_wraps_atx() {
        let signer = test_signer(1);
        let atx = signed_atx(&signer, 3, 1);
        let id = atx.id();

        let gossip = AtxGossip::new(atx);
        assert_eq!(gossip.atx().id(), id);
        assert_eq!(gossip.into_atx().id(), id);
    }

    #[test]
    fn test_message_type_is_atx_protocol() {
        assert_eq!(AtxGossip::message_type_id(), "ax1");
    }
}
