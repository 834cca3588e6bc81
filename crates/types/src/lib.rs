//! Core types for the activation subsystem.
//!
//! Identifiers, hashing, signing identities and the artifacts an identity
//! produces over a proving cycle: challenges, PoST and PoET results and the
//! final signed [`ActivationTx`].

mod atx;
mod challenge;
pub mod crypto;
mod hash;
mod identifiers;
mod merkle;
mod poet;
mod post;
pub mod signing;
mod state;

pub use atx::{ActivationTx, AtxContent, AtxHeader, NIPost, NipostState};
pub use challenge::NipostChallenge;
pub use crypto::{EdSigner, Signature};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, AtxId, EpochId, LayerId, NodeId, VrfNonce};
pub use merkle::{membership_proof, MerkleProof};
pub use poet::{PoetProof, PoetProofRef, PoetRegistration, PoetRound};
pub use post::{InitialPost, Post, PostInfo, PostMetadata, ZERO_CHALLENGE};
pub use signing::Domain;
pub use state::{CycleStage, PostState};
