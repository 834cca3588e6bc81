//! Errors returned by collaborators.

use smesher_types::AtxId;
use thiserror::Error;

/// ATX database failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("atx store backend error: {0}")]
    Backend(String),

    #[error("corrupt atx record {id}: {reason}")]
    Corrupt { id: AtxId, reason: String },
}

/// PoET service failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoetError {
    #[error("poet {address} unavailable: {reason}")]
    Unavailable { address: String, reason: String },

    #[error("poet request timed out")]
    Timeout,

    #[error("poet round {0} not finished")]
    RoundNotFinished(String),

    #[error("poet rejected registration: {0}")]
    Rejected(String),
}

/// PoST proving failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PostError {
    #[error("post data for identity not initialized")]
    NotInitialized,

    #[error("post proving failed: {0}")]
    Failed(String),
}

/// Proof or chain validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid post: {0}")]
    InvalidPost(String),

    #[error("invalid atx chain at {id}: {reason}")]
    InvalidChain { id: AtxId, reason: String },

    #[error("unknown atx {0}")]
    UnknownAtx(AtxId),
}

/// Broadcast failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("no peers")]
    NoPeers,

    #[error("transport error: {0}")]
    Transport(String),
}
