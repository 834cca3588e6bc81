//! Ed25519 signing identities and signatures.

use crate::signing::Domain;
use crate::NodeId;
use sbor::prelude::*;
use std::fmt;

/// An ed25519 signing identity.
///
/// The node identifier is the verifying key, so an identity can be
/// recovered from its secret key alone.
#[derive(Clone)]
pub struct EdSigner {
    key: ed25519_dalek::SigningKey,
}

impl EdSigner {
    /// Generate a new random signer.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a signer from a 32-byte seed (for testing/simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Node identifier derived from this signer.
    pub fn node_id(&self) -> NodeId {
        NodeId(self.key.verifying_key().to_bytes())
    }

    /// Sign `message` under the given domain.
    pub fn sign(&self, domain: Domain, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        let sig = self.key.sign(&domain.prefixed(message));
        Signature(sig.to_bytes().to_vec())
    }
}

impl fmt::Debug for EdSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdSigner({})", self.node_id())
    }
}

/// Verify a signature produced by [`EdSigner::sign`].
pub fn verify(node_id: &NodeId, domain: Domain, message: &[u8], signature: &Signature) -> bool {
    use ed25519_dalek::Verifier;
    let Ok(pk) = ed25519_dalek::VerifyingKey::from_bytes(node_id.as_bytes()) else {
        return false;
    };
    let Ok(sig_array) = <[u8; 64]>::try_from(signature.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
    pk.verify(&domain.prefixed(message), &sig).is_ok()
}

/// An ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create a zero/placeholder signature for testing.
    pub fn zero() -> Self {
        Signature(vec![0u8; 64])
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let signer = EdSigner::generate();
        let signature = signer.sign(Domain::Atx, b"atx body");

        assert!(verify(&signer.node_id(), Domain::Atx, b"atx body", &signature));
        assert!(!verify(&signer.node_id(), Domain::Atx, b"other body", &signature));
    }

    #[test]
    fn test_domain_separation() {
        let signer = EdSigner::generate();
        let signature = signer.sign(Domain::Poet, b"challenge");

        assert!(!verify(&signer.node_id(), Domain::Atx, b"challenge", &signature));
    }

    #[test]
    fn test_signer_from_seed_is_deterministic() {
        let seed = [42u8; 32];
        let a = EdSigner::from_seed(&seed);
        let b = EdSigner::from_seed(&seed);

        assert_eq!(a.node_id(), b.node_id());
        assert_eq!(a.sign(Domain::Atx, b"m"), b.sign(Domain::Atx, b"m"));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let signer = EdSigner::generate();
        assert!(!verify(&signer.node_id(), Domain::Atx, b"m", &Signature::zero()));
    }
}
