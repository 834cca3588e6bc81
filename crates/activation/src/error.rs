//! Builder errors and their recovery strategies.

use smesher_core::{PoetError, PostError, PublishError, StoreError, ValidationError};
use smesher_messages::CodecError;
use smesher_storage::StorageError;
use smesher_types::{AtxId, EpochId, NodeId};
use std::fmt;
use thiserror::Error;

/// Failure of one proving cycle.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The challenge can no longer produce a timely ATX.
    #[error("atx challenge expired: {0}")]
    ChallengeExpired(String),

    /// No PoET service could be used for this cycle.
    #[error("poet service unstable: {0}")]
    PoetServiceUnstable(String),

    #[error("initial post is invalid: {0}")]
    InvalidInitialPost(#[source] ValidationError),

    #[error("no initial post stored")]
    MissingInitialPost,

    /// The publication epoch of an initial challenge passed while proving.
    /// The initial post is kept, so this is not a stale-challenge error.
    #[error("atx publish epoch {publish_epoch} passed during nipost construction")]
    PublishEpochPassed { publish_epoch: EpochId },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("canceled")]
    Canceled,

    /// The ATX store returned a candidate that was already rejected.
    #[error("positioning atx selection returned rejected candidate {0}")]
    SelectionStalled(AtxId),

    #[error("local store: {0}")]
    Storage(#[from] StorageError),

    #[error("atx store: {0}")]
    Store(#[from] StoreError),

    #[error("post: {0}")]
    Post(#[from] PostError),

    #[error("poet: {0}")]
    Poet(#[from] PoetError),

    #[error("publish: {0}")]
    Publish(#[from] PublishError),

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// What the control loop does after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Reset proving progress, drop the challenge and wait one layer.
    DiscardChallenge,
    /// Sleep for the PoET retry interval.
    RetryAfterPoetInterval,
    /// Leave the loop.
    Exit,
    /// Wait one layer and retry.
    WaitLayer,
}

/// Map a cycle failure to its recovery action.
pub fn classify(err: &ActivationError) -> RecoveryAction {
    match err {
        ActivationError::ChallengeExpired(_) => RecoveryAction::DiscardChallenge,
        ActivationError::PoetServiceUnstable(_) => RecoveryAction::RetryAfterPoetInterval,
        ActivationError::Canceled => RecoveryAction::Exit,
        _ => RecoveryAction::WaitLayer,
    }
}

/// A failed per-identity reset during `stop_smeshing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetFailure {
    pub node: NodeId,
    pub error: StorageError,
}

impl fmt::Display for ResetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.error)
    }
}

/// Lifecycle errors of the [`Builder`](crate::Builder).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("already started")]
    AlreadyStarted,

    #[error("not started")]
    NotStarted,

    #[error("reset builder state failed: {}", join_failures(.0))]
    Reset(Vec<ResetFailure>),
}

fn join_failures(failures: &[ResetFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&ActivationError::ChallengeExpired("late".into())),
            RecoveryAction::DiscardChallenge
        );
        assert_eq!(
            classify(&ActivationError::PoetServiceUnstable("down".into())),
            RecoveryAction::RetryAfterPoetInterval
        );
        assert_eq!(classify(&ActivationError::Canceled), RecoveryAction::Exit);
    }

    #[test]
    fn test_everything_else_waits_a_layer() {
        let others = [
            ActivationError::DeadlineExceeded,
            ActivationError::MissingInitialPost,
            ActivationError::PublishEpochPassed {
                publish_epoch: EpochId(3),
            },
            ActivationError::InvalidInitialPost(ValidationError::InvalidPost("bad".into())),
            ActivationError::SelectionStalled(AtxId::EMPTY),
            ActivationError::Post(PostError::NotInitialized),
            ActivationError::Poet(PoetError::Timeout),
            ActivationError::Store(StoreError::Backend("io".into())),
        ];
        for err in &others {
            assert_eq!(classify(err), RecoveryAction::WaitLayer, "{}", err);
        }
    }

    #[test]
    fn test_reset_error_lists_every_identity() {
        let node = NodeId([1u8; 32]);
        let err = BuilderError::Reset(vec![
            ResetFailure {
                node,
                error: StorageError::Backend {
                    operation: "delete_cf".into(),
                    details: "io".into(),
                },
            },
            ResetFailure {
                node: NodeId([2u8; 32]),
                error: StorageError::Backend {
                    operation: "write".into(),
                    details: "full".into(),
                },
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains(&node.short_string()));
        assert!(msg.contains("full"));
    }
}
