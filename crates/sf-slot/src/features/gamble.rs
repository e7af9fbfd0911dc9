//! Gamble (double or nothing)
//!
//! After a paid win the player may stake it on a red/black guess. A right
//! guess doubles the pending amount, a wrong one loses it; reaching the round
//! cap collects automatically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GambleConfig;

/// Gamble error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GambleError {
    #[error("No win available to gamble")]
    NotAvailable,

    #[error("No gamble in progress")]
    NotActive,
}

/// Card color guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GambleChoice {
    Red,
    Black,
}

impl GambleChoice {
    pub fn other(self) -> Self {
        match self {
            GambleChoice::Red => GambleChoice::Black,
            GambleChoice::Black => GambleChoice::Red,
        }
    }
}

/// Player's answer to a gamble offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GambleDecision {
    Gamble(GambleChoice),
    Collect,
}

/// `features.gamble`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GambleState {
    /// A win is on offer
    pub available: bool,
    pub active: bool,
    /// Amount originally staked
    pub stake: f64,
    /// Amount collectable right now
    pub pending: f64,
    pub round: u32,
}

/// One resolved guess
#[derive(Debug, Clone, PartialEq)]
pub struct GambleRound {
    pub choice: GambleChoice,
    pub drawn: GambleChoice,
    pub won: bool,
    pub pending: f64,
    pub round: u32,
    /// Lost, or the round cap was reached
    pub finished: bool,
}

impl GambleState {
    /// Stake an offered win
    pub fn start(&mut self, stake: f64) -> Result<(), GambleError> {
        if !self.available || stake <= 0.0 {
            return Err(GambleError::NotAvailable);
        }
        *self = Self {
            available: false,
            active: true,
            stake,
            pending: stake,
            round: 0,
        };
        Ok(())
    }

    /// Resolve a guess with a uniform `roll` in `[0, 1)`
    pub fn resolve(
        &mut self,
        config: &GambleConfig,
        choice: GambleChoice,
        roll: f64,
    ) -> Result<GambleRound, GambleError> {
        if !self.active {
            return Err(GambleError::NotActive);
        }
        let won = roll < config.win_chance;
        self.round += 1;
        if won {
            self.pending *= 2.0;
        } else {
            self.pending = 0.0;
            self.active = false;
        }

        Ok(GambleRound {
            choice,
            drawn: if won { choice } else { choice.other() },
            won,
            pending: self.pending,
            round: self.round,
            finished: !won || self.round >= config.max_rounds,
        })
    }

    /// Take the pending amount and close the gamble
    pub fn collect(&mut self) -> Result<f64, GambleError> {
        if !self.active {
            return Err(GambleError::NotActive);
        }
        let amount = self.pending;
        *self = Self::default();
        Ok(amount)
    }
}
