//! Common error types for MatrixPool
//!
//! This module defines the error type shared by the coordinator, the workers
//! and the client. Domain failures (no free worker, invalid operation, ...)
//! are not errors at this level; they travel as strings inside an
//! `OperationResult`. `PoolError` covers everything underneath that.

use matrixpool_proto::{FrameError, OperationError};
use thiserror::Error;

/// Main error type for MatrixPool
#[derive(Error, Debug)]
pub enum PoolError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not establish a connection to a peer
    #[error("Connection error: {0}")]
    Connection(String),

    /// The peer was reached but the call itself failed
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Framing errors on an established connection
    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input, rejected before anything is sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Map a failed worker call onto the dispatch error taxonomy
    ///
    /// Only a failure to connect counts as a connection failure; anything that
    /// goes wrong once the connection is up is a computation failure.
    pub fn to_operation_error(&self) -> OperationError {
        match self {
            PoolError::Connection(_) => OperationError::WorkerConnectionFailed,
            _ => OperationError::WorkerComputationFailed,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PoolError::Config(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        PoolError::Connection(msg.into())
    }

    /// Create an RPC error
    pub fn rpc(msg: impl Into<String>) -> Self {
        PoolError::Rpc(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PoolError::InvalidInput(msg.into())
    }
}

/// Result type alias for MatrixPool operations
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_mapping() {
        assert_eq!(
            PoolError::connection("refused").to_operation_error(),
            OperationError::WorkerConnectionFailed
        );
        assert_eq!(
            PoolError::rpc("unknown method").to_operation_error(),
            OperationError::WorkerComputationFailed
        );
        assert_eq!(
            PoolError::Protocol(FrameError::ConnectionClosed).to_operation_error(),
            OperationError::WorkerComputationFailed
        );
    }
}
