//! Spin phases, results and outcomes

use std::fmt;

use serde::{Deserialize, Serialize};
use sf_core::Grid;

use crate::paytable::{BonusTrigger, WinInfo};

/// Where a spin is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    #[default]
    Idle,
    Spinning,
    Evaluating,
    FeatureHandling,
    Settling,
}

impl fmt::Display for SpinPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpinPhase::Idle => "idle",
            SpinPhase::Spinning => "spinning",
            SpinPhase::Evaluating => "evaluating",
            SpinPhase::FeatureHandling => "feature handling",
            SpinPhase::Settling => "settling",
        };
        f.write_str(name)
    }
}

/// Complete result of one spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResult {
    pub spin_id: u64,
    pub bet: f64,
    pub free_spin: bool,
    /// Start index per reel strip
    pub reel_positions: Vec<usize>,
    /// Grid the reels stopped on
    pub grid: Grid,
    /// Grid after the last cascade step
    pub final_grid: Grid,
    pub anticipation: Vec<usize>,
    /// Base evaluation (paylines + scatter)
    pub win: WinInfo,
    pub bonus: BonusTrigger,
    pub cascade_steps: u32,
    pub cascade_win: f64,
    /// Free-spin multiplier applied to this spin (1 on paid spins)
    pub multiplier: f64,
    /// Credited for this spin: `(base + cascades) × multiplier`
    pub total_win: f64,
    pub free_spins_awarded: u32,
    /// Free spins played as a consequence of this spin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_spins: Vec<SpinResult>,
}

impl SpinResult {
    pub fn win_ratio(&self) -> f64 {
        if self.bet > 0.0 { self.total_win / self.bet } else { 0.0 }
    }

    /// This spin plus every free spin it led to
    pub fn total_with_free_spins(&self) -> f64 {
        self.total_win
            + self
                .free_spins
                .iter()
                .map(SpinResult::total_with_free_spins)
                .sum::<f64>()
    }
}

/// Why a spin was not started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SpinRejection {
    AlreadySpinning,
    BonusActive,
    GambleActive,
    InsufficientCredits { credits: f64, bet: f64 },
    Disposed,
}

impl SpinRejection {
    /// Player-facing text
    pub fn message(&self) -> String {
        match self {
            SpinRejection::AlreadySpinning => "Spin in progress".to_string(),
            SpinRejection::BonusActive => "Finish the bonus game first".to_string(),
            SpinRejection::GambleActive => "Finish the gamble first".to_string(),
            SpinRejection::InsufficientCredits { .. } => "Insufficient credits".to_string(),
            SpinRejection::Disposed => "Game is shut down".to_string(),
        }
    }
}

impl fmt::Display for SpinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// What became of a spin request
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    Completed(Box<SpinResult>),
    Rejected(SpinRejection),
    /// Failed mid-pipeline; state was restored and the bet refunded
    RolledBack { reason: String },
}

impl SpinOutcome {
    pub fn result(&self) -> Option<&SpinResult> {
        match self {
            SpinOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SpinOutcome::Completed(_))
    }
}
