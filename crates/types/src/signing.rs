//! Domain-separated signing.
//!
//! Every signature an identity produces is bound to a domain so that a
//! signature over an ATX can never be replayed as a PoET registration and
//! vice versa.
//!
//! | Domain | Tag | Signed content |
//! |--------|-----|----------------|
//! | `Atx` | `ATX:` | [`ActivationTx`](crate::ActivationTx) signed bytes |
//! | `Poet` | `POET:` | challenge hash submitted to a PoET service |

/// Signing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Activation transactions.
    Atx,
    /// PoET registrations.
    Poet,
}

/// Domain tag for activation transactions.
pub const DOMAIN_ATX: &[u8] = b"ATX:";

/// Domain tag for PoET registrations.
pub const DOMAIN_POET: &[u8] = b"POET:";

impl Domain {
    /// The tag prepended to signed content.
    pub fn tag(self) -> &'static [u8] {
        match self {
            Domain::Atx => DOMAIN_ATX,
            Domain::Poet => DOMAIN_POET,
        }
    }

    /// Build the signing message: tag || message.
    pub fn prefixed(self, message: &[u8]) -> Vec<u8> {
        let tag = self.tag();
        let mut out = Vec::with_capacity(tag.len() + message.len());
        out.extend_from_slice(tag);
        out.extend_from_slice(message);
        out
    }
}
