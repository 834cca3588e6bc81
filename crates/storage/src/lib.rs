//! Local persistent state of the activation builder.
//!
//! Everything an identity needs to resume after a restart lives here:
//!
//! - the current cycle's challenge (at most one per identity)
//! - the initial PoST (at most one per identity)
//! - the proving progress of the current cycle
//!
//! Two implementations share the [`LocalStore`] contract: [`MemoryLocalStore`]
//! for tests and simulation, and [`RocksLocalStore`] for nodes.

mod error;
mod memory;
mod progress;
mod rocks;

pub use error::StorageError;
pub use memory::MemoryLocalStore;
pub use progress::ProvingProgress;
pub use rocks::RocksLocalStore;

use smesher_types::{InitialPost, NipostChallenge, NodeId};

/// Per-identity persisted builder state.
///
/// Every call is atomic: a failed call leaves the store unchanged.
pub trait LocalStore: Send + Sync {
    /// Persist the identity's challenge. Fails with
    /// [`StorageError::AlreadyExists`] if one is already stored.
    fn add_challenge(&self, node: &NodeId, challenge: &NipostChallenge)
        -> Result<(), StorageError>;

    fn challenge(&self, node: &NodeId) -> Result<Option<NipostChallenge>, StorageError>;

    /// Delete the identity's challenge. Deleting nothing is not an error.
    fn remove_challenge(&self, node: &NodeId) -> Result<(), StorageError>;

    /// Persist the identity's initial PoST. Fails with
    /// [`StorageError::AlreadyExists`] if one is already stored.
    fn add_initial_post(&self, node: &NodeId, post: &InitialPost) -> Result<(), StorageError>;

    fn initial_post(&self, node: &NodeId) -> Result<Option<InitialPost>, StorageError>;

    fn remove_initial_post(&self, node: &NodeId) -> Result<(), StorageError>;

    /// Proving progress of the current cycle; [`ProvingProgress::NotStarted`]
    /// if nothing is stored.
    fn proving_progress(&self, node: &NodeId) -> Result<ProvingProgress, StorageError>;

    /// Record a completed proving phase. Progress moves one phase at a time
    /// and never skips one; see
    /// [`ProvingProgress::can_advance_to`].
    fn advance_progress(
        &self,
        node: &NodeId,
        progress: &ProvingProgress,
    ) -> Result<(), StorageError>;

    /// Drop all proving progress of the identity.
    fn reset_progress(&self, node: &NodeId) -> Result<(), StorageError>;
}
