//! Deterministic simulation of the activation builder's collaborators.
//!
//! Everything here runs in-process on tokio's clock, so a paused runtime
//! (`start_paused = true`) drives whole epochs of proving in milliseconds
//! and produces the same schedule on every run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       SimClock                           │
//! │        layer/epoch timing on tokio::time::Instant        │
//! └───────┬──────────────────┬──────────────────┬────────────┘
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │   SimPoet    │   │ SimPostProver │   │    SimNetwork    │
//! │ rounds/proof │   │  fake PoSTs   │   │ decode + store ──┼──┐
//! └──────────────┘   └───────────────┘   └──────────────────┘  │
//!                                                              ▼
//!                    ┌───────────────┐   ┌──────────────────┐
//!                    │ SimValidator  │──▶│  MemoryAtxStore  │
//!                    │  chain walk   │   │ headers + blobs  │
//!                    └───────────────┘   └──────────────────┘
//! ```

mod atxs;
mod clock;
mod network;
mod poet;
mod post;
mod sync;
mod validator;

pub use atxs::MemoryAtxStore;
pub use clock::SimClock;
pub use network::SimNetwork;
pub use poet::SimPoet;
pub use post::{simulated_post, simulated_vrf_nonce, SimPostProver};
pub use sync::SimSyncer;
pub use validator::SimValidator;
