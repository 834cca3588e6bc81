//! PoET service stand-in.

use async_trait::async_trait;
use parking_lot::Mutex;
use smesher_core::{LayerClock, PoetClient, PoetError};
use smesher_types::{
    crypto, membership_proof, Domain, EpochId, Hash, NodeId, PoetProof, PoetRound, Signature,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// In-process PoET service.
///
/// Round `e` opens at `epoch_to_time(e) + phase_shift` and ends one epoch
/// later minus `cycle_gap`. Submissions go to the next round to open; proofs
/// are served once a round has ended, with a fixed leaf count.
pub struct SimPoet {
    address: String,
    clock: Arc<dyn LayerClock>,
    phase_shift: Duration,
    cycle_gap: Duration,
    leaf_count: u64,
    rounds: Mutex<HashMap<u32, Vec<Hash>>>,
    submissions: AtomicUsize,
    failing: AtomicBool,
    last_proof: Mutex<Option<PoetProof>>,
}

impl SimPoet {
    pub fn new(
        address: impl Into<String>,
        clock: Arc<dyn LayerClock>,
        phase_shift: Duration,
        cycle_gap: Duration,
        leaf_count: u64,
    ) -> Self {
        Self {
            address: address.into(),
            clock,
            phase_shift,
            cycle_gap,
            leaf_count,
            rounds: Mutex::new(HashMap::new()),
            submissions: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            last_proof: Mutex::new(None),
        }
    }

    /// Accepted submissions so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Make the service unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The proof most recently served.
    pub fn last_proof(&self) -> Option<PoetProof> {
        self.last_proof.lock().clone()
    }

    fn round_start(&self, round: u32) -> SystemTime {
        self.clock.epoch_to_time(EpochId(round)) + self.phase_shift
    }

    fn round_end(&self, round: u32) -> SystemTime {
        let end = self.clock.epoch_to_time(EpochId(round + 1)) + self.phase_shift;
        end.checked_sub(self.cycle_gap).unwrap_or(end)
    }

    /// The round accepting submissions now.
    fn open_round(&self) -> u32 {
        let now = self.clock.now();
        let mut round = self.clock.current_epoch().0.saturating_sub(1);
        while self.round_start(round) <= now {
            round += 1;
        }
        round
    }

    fn check_reachable(&self) -> Result<(), PoetError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PoetError::Unavailable {
                address: self.address.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PoetClient for SimPoet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn submit(
        &self,
        deadline: SystemTime,
        challenge: &Hash,
        signature: &Signature,
        node: &NodeId,
    ) -> Result<PoetRound, PoetError> {
        self.check_reachable()?;
        if self.clock.now() >= deadline {
            return Err(PoetError::Rejected("submission deadline passed".to_string()));
        }
        if !crypto::verify(node, Domain::Poet, challenge.as_bytes(), signature) {
            return Err(PoetError::Rejected("invalid signature".to_string()));
        }

        let round = self.open_round();
        {
            let mut rounds = self.rounds.lock();
            let members = rounds.entry(round).or_default();
            if !members.contains(challenge) {
                members.push(*challenge);
            }
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
        debug!(poet = %self.address, round, smesher = %node, "challenge submitted");
        Ok(PoetRound {
            id: round.to_string(),
            end: self.round_end(round),
        })
    }

    async fn proof(&self, round_id: &str) -> Result<(PoetProof, Vec<Hash>), PoetError> {
        self.check_reachable()?;
        let round: u32 = round_id
            .parse()
            .map_err(|_| PoetError::Rejected(format!("unknown round {}", round_id)))?;
        if self.clock.now() < self.round_end(round) {
            return Err(PoetError::RoundNotFinished(round_id.to_string()));
        }

        let members = self.rounds.lock().get(&round).cloned().unwrap_or_default();
        let members_root = membership_proof(&members, 0).map_or(Hash::ZERO, |(root, _)| root);
        let proof = PoetProof {
            round_id: round_id.to_string(),
            members_root,
            leaf_count: self.leaf_count,
        };
        *self.last_proof.lock() = Some(proof.clone());
        Ok((proof, members))
    }
}
