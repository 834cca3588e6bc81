//! Network messages for the activation subsystem.

pub mod codec;
pub mod gossip;

pub use codec::{decode_atx, encode_atx, CodecError};
pub use gossip::{AtxGossip, ATX_PROTOCOL};

/// A message with a stable type identifier on the wire.
pub trait NetworkMessage {
    /// Protocol / topic the message is broadcast on.
    fn message_type_id() -> &'static str;
}
