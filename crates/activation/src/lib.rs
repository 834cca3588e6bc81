//! Activation transaction (ATX) builder.
//!
//! Runs one crash-recoverable control loop per registered identity. Each
//! cycle:
//!
//! 1. builds (or reuses) the identity's challenge for the next PoET round,
//!    anchored at the highest fully valid ATX
//! 2. has the NIPoST builder register with PoET, fetch the proof and run the
//!    PoST against it
//! 3. waits for the publication epoch, signs the ATX and broadcasts it until
//!    it goes out
//!
//! Failures are classified into recovery actions ([`classify`]) and the loop
//! retries. All intermediate state needed to resume lives in a
//! [`LocalStore`](smesher_storage::LocalStore).

mod builder;
mod challenge;
mod config;
mod error;
mod nipost;
mod positioning;
mod publish;
mod run;
mod states;
mod wait;

pub use builder::{Builder, BuilderDeps};
pub use config::{BuilderConfig, PoetConfig, MAX_CHALLENGE_BUILD_JITTER_PERCENT};
pub use error::{classify, ActivationError, BuilderError, RecoveryAction, ResetFailure};
pub use nipost::{NipostBuilder, NipostProofBuilder};
pub use positioning::PositioningSelector;
pub use states::{CycleStages, PostStates, StateRegistry};
