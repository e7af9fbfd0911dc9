//! Error types for the slot engine

use sf_core::CoreError;
use sf_state::{StateError, StorageError};
use thiserror::Error;

use crate::features::{BonusError, GambleError};

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported config format: {0:?}")]
    UnsupportedFormat(String),

    /// Every violation found by [`crate::GameConfig::validate`]
    #[error("Invalid configuration ({} problems): {}", violations.len(), violations.join("; "))]
    Invalid { violations: Vec<String> },
}

/// Result type alias
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Presenter (rendering collaborator) failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Presenter failed: {0}")]
pub struct PresentError(pub String);

impl PresentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Result type alias
pub type PresentResult<T> = Result<T, PresentError>;

/// A registry delay was cancelled before it elapsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Timer '{label}' cancelled")]
pub struct TimerCancelled {
    pub label: String,
}

/// Slot game error
#[derive(Error, Debug)]
pub enum GameError {
    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Present(#[from] PresentError),

    #[error("{0}")]
    Timer(#[from] TimerCancelled),

    #[error("Grid error: {0}")]
    Grid(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bonus error: {0}")]
    Bonus(#[from] BonusError),

    #[error("Gamble error: {0}")]
    Gamble(#[from] GambleError),

    /// Action not allowed in the current phase
    #[error("Busy: {0}")]
    Busy(&'static str),

    #[error("Grid is {reels}x{rows}, game is {expected_reels}x{expected_rows}")]
    GridShape {
        reels: usize,
        rows: usize,
        expected_reels: usize,
        expected_rows: usize,
    },

    #[error("Bet index {index} out of range (0..{count})")]
    InvalidBet { index: usize, count: usize },

    #[error("Feature '{feature}' unlocks at level {level}")]
    Locked { feature: String, level: u32 },
}

/// Result type alias
pub type GameResult<T> = Result<T, GameError>;
