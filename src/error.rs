//! Errors returned by bridge operations.

use std::fmt;
use std::time::Duration;

/// The bridge operation that gave up waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Handshake,
    NewGame,
    Search,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Handshake => write!(f, "handshake"),
            Operation::NewGame => write!(f, "new game"),
            Operation::Search => write!(f, "search"),
        }
    }
}

/// Every failure a caller can see. None of these are retried by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("engine is not ready (run the handshake first)")]
    NotReady,

    #[error("failed to start engine: {0}")]
    SpawnFailure(String),

    #[error("failed to write to engine: {0}")]
    WriteFailure(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: Operation, after: Duration },

    #[error("a search is already in flight")]
    SearchInProgress,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// The engine is most likely gone. The embedding layer should call
    /// `quit` to reset state before reconnecting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::WriteFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
