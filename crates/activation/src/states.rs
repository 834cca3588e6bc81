//! Observable per-identity state registries.

use parking_lot::Mutex;
use smesher_types::{CycleStage, NodeId, PostState};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Latest state of each identity.
pub struct StateRegistry<S> {
    states: Mutex<HashMap<NodeId, S>>,
}

/// PoST prover state per identity.
pub type PostStates = StateRegistry<PostState>;

/// Control loop stage per identity.
pub type CycleStages = StateRegistry<CycleStage>;

impl<S> Default for StateRegistry<S> {
    fn default() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Copy + PartialEq + fmt::Display> StateRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node: NodeId, state: S) {
        let previous = self.states.lock().insert(node, state);
        if previous != Some(state) {
            debug!(smesher = %node, %state, "state changed");
        }
    }

    pub fn get(&self, node: &NodeId) -> Option<S> {
        self.states.lock().get(node).copied()
    }

    pub fn snapshot(&self) -> HashMap<NodeId, S> {
        self.states.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let states = PostStates::new();
        let node = NodeId([1u8; 32]);

        assert_eq!(states.get(&node), None);
        states.set(node, PostState::Proving);
        states.set(node, PostState::Idle);
        assert_eq!(states.get(&node), Some(PostState::Idle));
        assert_eq!(states.snapshot().len(), 1);
    }
}
