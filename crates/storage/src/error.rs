use smesher_types::NodeId;
use thiserror::Error;

/// Local store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{what} already exists for {node}")]
    AlreadyExists { what: &'static str, node: NodeId },

    #[error("invalid proving progress transition for {node}: {from} -> {to}")]
    InvalidTransition {
        node: NodeId,
        from: &'static str,
        to: &'static str,
    },

    #[error("rocksdb {operation}: {details}")]
    Backend { operation: String, details: String },

    #[error("corrupt {what} record: {details}")]
    Corrupt { what: &'static str, details: String },
}

impl StorageError {
    pub(crate) fn backend(operation: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Backend {
            operation: operation.to_string(),
            details: err.to_string(),
        }
    }
}
