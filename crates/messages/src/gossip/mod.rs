//! Gossip messages broadcast to all peers.

mod atx;

pub use atx::{AtxGossip, ATX_PROTOCOL};
