//! In-memory local store.

use crate::{LocalStore, ProvingProgress, StorageError};
use parking_lot::Mutex;
use smesher_types::{InitialPost, NipostChallenge, NodeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[derive(Default)]
struct Inner {
    challenges: HashMap<NodeId, NipostChallenge>,
    initial_posts: HashMap<NodeId, InitialPost>,
    progress: HashMap<NodeId, ProvingProgress>,
}

/// [`LocalStore`] kept in process memory. State is lost on drop.
#[derive(Default)]
pub struct MemoryLocalStore {
    inner: Mutex<Inner>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn add_challenge(
        &self,
        node: &NodeId,
        challenge: &NipostChallenge,
    ) -> Result<(), StorageError> {
        match self.inner.lock().challenges.entry(*node) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                what: "challenge",
                node: *node,
            }),
            Entry::Vacant(slot) => {
                slot.insert(challenge.clone());
                Ok(())
            }
        }
    }

    fn challenge(&self, node: &NodeId) -> Result<Option<NipostChallenge>, StorageError> {
        Ok(self.inner.lock().challenges.get(node).cloned())
    }

    fn remove_challenge(&self, node: &NodeId) -> Result<(), StorageError> {
        self.inner.lock().challenges.remove(node);
        Ok(())
    }

    fn add_initial_post(&self, node: &NodeId, post: &InitialPost) -> Result<(), StorageError> {
        match self.inner.lock().initial_posts.entry(*node) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                what: "initial post",
                node: *node,
            }),
            Entry::Vacant(slot) => {
                slot.insert(post.clone());
                Ok(())
            }
        }
    }

    fn initial_post(&self, node: &NodeId) -> Result<Option<InitialPost>, StorageError> {
        Ok(self.inner.lock().initial_posts.get(node).cloned())
    }

    fn remove_initial_post(&self, node: &NodeId) -> Result<(), StorageError> {
        self.inner.lock().initial_posts.remove(node);
        Ok(())
    }

    fn proving_progress(&self, node: &NodeId) -> Result<ProvingProgress, StorageError> {
        Ok(self
            .inner
            .lock()
            .progress
            .get(node)
            .cloned()
            .unwrap_or_default())
    }

    fn advance_progress(
        &self,
        node: &NodeId,
        progress: &ProvingProgress,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let current = inner.progress.get(node).cloned().unwrap_or_default();
        if !current.can_advance_to(progress) {
            return Err(StorageError::InvalidTransition {
                node: *node,
                from: current.name(),
                to: progress.name(),
            });
        }
        inner.progress.insert(*node, progress.clone());
        Ok(())
    }

    fn reset_progress(&self, node: &NodeId) -> Result<(), StorageError> {
        self.inner.lock().progress.remove(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_test_helpers::{atx_id, regular_challenge, test_initial_post, test_node};
    use smesher_types::{Hash, MerkleProof};

    #[test]
    fn test_one_challenge_per_identity() {
        let store = MemoryLocalStore::new();
        let node = test_node(1);
        let first = regular_challenge(4, 2, atx_id(b"a"));
        let second = regular_challenge(4, 3, atx_id(b"b"));

        store.add_challenge(&node, &first).unwrap();
        assert_eq!(
            store.add_challenge(&node, &second),
            Err(StorageError::AlreadyExists {
                what: "challenge",
                node
            })
        );
        assert_eq!(store.challenge(&node).unwrap(), Some(first));

        store.add_challenge(&test_node(2), &second).unwrap();
    }

    #[test]
    fn test_remove_challenge_is_idempotent() {
        let store = MemoryLocalStore::new();
        let node = test_node(1);

        store
            .add_challenge(&node, &regular_challenge(1, 1, atx_id(b"a")))
            .unwrap();
        store.remove_challenge(&node).unwrap();
        store.remove_challenge(&node).unwrap();
        assert_eq!(store.challenge(&node).unwrap(), None);
    }

    #[test]
    fn test_initial_post_not_overwritten() {
        let store = MemoryLocalStore::new();
        let node = test_node(1);
        let post = test_initial_post(atx_id(b"commit"));

        store.add_initial_post(&node, &post).unwrap();
        let mut other = post.clone();
        other.num_units = 99;
        assert!(store.add_initial_post(&node, &other).is_err());
        assert_eq!(store.initial_post(&node).unwrap(), Some(post));

        store.remove_initial_post(&node).unwrap();
        assert_eq!(store.initial_post(&node).unwrap(), None);
    }

    #[test]
    fn test_progress_forward_only_and_reset() {
        let store = MemoryLocalStore::new();
        let node = test_node(1);
        let registered = ProvingProgress::Registered {
            challenge: Hash::from_bytes(b"c"),
            registrations: vec![],
        };

        assert_eq!(
            store.proving_progress(&node).unwrap(),
            ProvingProgress::NotStarted
        );
        store.advance_progress(&node, &registered).unwrap();
        assert!(matches!(
            store.advance_progress(&node, &registered),
            Err(StorageError::InvalidTransition { .. })
        ));

        store.reset_progress(&node).unwrap();
        assert_eq!(
            store.proving_progress(&node).unwrap(),
            ProvingProgress::NotStarted
        );
        store.advance_progress(&node, &registered).unwrap();
    }

    #[test]
    fn test_progress_cannot_skip_a_phase() {
        let store = MemoryLocalStore::new();
        let node = test_node(1);
        let obtained = ProvingProgress::ProofObtained {
            challenge: Hash::from_bytes(b"c"),
            proof: Hash::from_bytes(b"p"),
            membership: MerkleProof {
                leaf_index: 0,
                siblings: vec![],
            },
            leaf_count: 5,
        };

        assert_eq!(
            store.advance_progress(&node, &obtained),
            Err(StorageError::InvalidTransition {
                node,
                from: "not_started",
                to: "proof_obtained",
            })
        );
        assert_eq!(
            store.proving_progress(&node).unwrap(),
            ProvingProgress::NotStarted
        );
    }
}
