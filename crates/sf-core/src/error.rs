//! Error types for SpinForge core types

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Grid has no reels")]
    EmptyGrid,

    #[error("Reel {reel} has {actual} rows, expected {expected}")]
    RaggedReel {
        reel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Position ({reel}, {row}) is outside a {reels}x{rows} grid")]
    OutOfBounds {
        reel: usize,
        row: usize,
        reels: usize,
        rows: usize,
    },
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
