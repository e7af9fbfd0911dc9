//! Error types for the state store and storage backends

use thiserror::Error;

/// State store error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Optimistic-lock failure: the store advanced past the expected version
    #[error("Stale update: expected version {expected}, store is at {actual}")]
    StaleUpdate { expected: u64, actual: u64 },

    #[error("State store is not initialized")]
    NotInitialized,

    #[error("State store is already initialized")]
    AlreadyInitialized,

    #[error("State store has been disposed")]
    Disposed,

    #[error("Invalid state path: {0:?}")]
    InvalidPath(String),

    /// Tried to descend through a primitive value
    #[error("Path {path:?} runs through a non-object value at {at:?}")]
    NotAnObject { path: String, at: String },
}

impl StateError {
    /// Whether the caller should re-read and retry
    pub fn is_stale(&self) -> bool {
        matches!(self, StateError::StaleUpdate { .. })
    }
}

/// Result type alias
pub type StateResult<T> = Result<T, StateError>;

/// Save storage error
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
