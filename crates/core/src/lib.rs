//! Interfaces the activation builder drives.
//!
//! The builder owns no clock, network, proof engine or ATX database of its
//! own. Everything it talks to is behind one of the traits here, so the
//! production node and the deterministic simulation plug in the same way.
//!
//! | Trait | Provides |
//! |-------|----------|
//! | [`LayerClock`] | layer/epoch timing and waiting for layer starts |
//! | [`AtxSyncer`] | the "ATXs are synced" signal |
//! | [`AtxProvider`] | read access to known ATXs |
//! | [`NipostValidator`] | PoST and ATX chain validation |
//! | [`PoetClient`] | one PoET service |
//! | [`PostProver`] | PoST proof generation |
//! | [`Publisher`] | gossip broadcast |

mod atxs;
mod clock;
mod error;
mod poet;
mod post;
mod publish;
mod validator;

pub use atxs::{AtxProvider, AtxSyncer};
pub use clock::LayerClock;
pub use error::{PoetError, PostError, PublishError, StoreError, ValidationError};
pub use poet::PoetClient;
pub use post::PostProver;
pub use publish::Publisher;
pub use validator::{NipostValidator, VerifyChainOpts};
