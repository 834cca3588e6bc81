//! Wire encoding for ATX gossip.
//!
//! The payload on [`ATX_PROTOCOL`](crate::ATX_PROTOCOL) is the SBOR encoding
//! of the signed [`ActivationTx`]. Decoding checks the signature so a
//! receiver never stores an ATX its claimed smesher did not sign.

use crate::AtxGossip;
use smesher_types::ActivationTx;
use thiserror::Error;

/// Errors that can occur during ATX encoding/decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Message too short")]
    MessageTooShort,

    #[error("SBOR decode error: {0}")]
    SborDecode(String),

    #[error("SBOR encode error: {0}")]
    SborEncode(String),

    #[error("Invalid ATX signature")]
    InvalidSignature,
}

/// Encode a signed ATX for broadcast.
pub fn encode_atx(atx: &ActivationTx) -> Result<Vec<u8>, CodecError> {
    sbor::basic_encode(&AtxGossip::new(atx.clone()))
        .map_err(|e| CodecError::SborEncode(format!("{:?}", e)))
}

/// Decode and signature-check an ATX received from the network.
pub fn decode_atx(data: &[u8]) -> Result<ActivationTx, CodecError> {
    if data.is_empty() {
        return Err(CodecError::MessageTooShort);
    }

    let gossip: AtxGossip =
        sbor::basic_decode(data).map_err(|e| CodecError::SborDecode(format!("{:?}", e)))?;
    let atx = gossip.into_atx();
    if !atx.verify_signature() {
        return Err(CodecError::InvalidSignature);
    }
    Ok(atx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_test_helpers::{signed_atx, test_signer};

    #[test]
    fn test_decode_preserves_id() {
        let atx = signed_atx(&test_signer(2), 5, 0);
        let bytes = encode_atx(&atx).unwrap();

        let decoded = decode_atx(&bytes).unwrap();
        assert_eq!(decoded.id(), atx.id());
        assert_eq!(decoded, atx);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(decode_atx(&[]), Err(CodecError::MessageTooShort));
    }

    #[test]
    fn test_garbage_payload() {
        assert!(matches!(
            decode_atx(&[0xde, 0xad, 0xbe, 0xef]),
            Err(CodecError::SborDecode(_))
        ));
    }
}
