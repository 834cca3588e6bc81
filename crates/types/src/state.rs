//! Observable per-identity states.

use std::fmt;

/// Whether an identity's PoST prover is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostState {
    #[default]
    Idle,
    Proving,
}

impl fmt::Display for PostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostState::Idle => write!(f, "idle"),
            PostState::Proving => write!(f, "proving"),
        }
    }
}

/// Where an identity's control loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CycleStage {
    /// Building or waiting for the initial PoST.
    #[default]
    AwaitingInitialPost,
    /// Initial PoST exists; about to start a cycle.
    Ready,
    /// Waiting for sync and the PoET round, then building the challenge.
    BuildingChallenge,
    /// Searching for a positioning ATX.
    AwaitingAnchor,
    /// PoET registration, proof fetching and PoST execution.
    Proving,
    /// Proof done; waiting for the publication epoch.
    AwaitingPublicationEpoch,
    /// Broadcasting the signed ATX.
    Publishing,
    /// The control loop has exited.
    Stopped,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleStage::AwaitingInitialPost => "awaiting_initial_post",
            CycleStage::Ready => "ready",
            CycleStage::BuildingChallenge => "building_challenge",
            CycleStage::AwaitingAnchor => "awaiting_anchor",
            CycleStage::Proving => "proving",
            CycleStage::AwaitingPublicationEpoch => "awaiting_publication_epoch",
            CycleStage::Publishing => "publishing",
            CycleStage::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
