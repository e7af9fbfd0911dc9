//! Pick bonus game
//!
//! Landing enough BONUS symbols on paylines opens a board of face-down
//! slots. Each pick reveals a prize (a multiple of the triggering bet); the
//! game ends when the picks run out and the accumulated prize is paid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BonusConfig;

/// Bonus game error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BonusError {
    #[error("No bonus game in progress")]
    NotActive,

    #[error("Slot {slot} out of range (0..{slots})")]
    SlotOutOfRange { slot: usize, slots: usize },

    #[error("Slot {0} already picked")]
    AlreadyPicked(usize),
}

/// `features.bonus`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BonusState {
    pub active: bool,
    pub picks_remaining: u32,
    pub total_win: f64,
    /// One entry per slot, `Some(prize)` once picked
    pub revealed: Vec<Option<f64>>,
    /// Bet the bonus was triggered with
    pub bet: f64,
}

/// Result of one pick
#[derive(Debug, Clone, PartialEq)]
pub struct BonusPick {
    pub slot: usize,
    pub prize: f64,
    pub picks_remaining: u32,
    pub total_win: f64,
    /// Picks exhausted; `total_win` is due
    pub finished: bool,
}

impl BonusState {
    /// Fresh board
    pub fn start(config: &BonusConfig, bet: f64) -> Self {
        Self {
            active: true,
            picks_remaining: config.picks,
            total_win: 0.0,
            revealed: vec![None; config.slots],
            bet,
        }
    }

    /// Reveal `slot` holding `prize`
    pub fn pick(&mut self, slot: usize, prize: f64) -> Result<BonusPick, BonusError> {
        if !self.active || self.picks_remaining == 0 {
            return Err(BonusError::NotActive);
        }
        let slots = self.revealed.len();
        let cell = self
            .revealed
            .get_mut(slot)
            .ok_or(BonusError::SlotOutOfRange { slot, slots })?;
        if cell.is_some() {
            return Err(BonusError::AlreadyPicked(slot));
        }

        *cell = Some(prize);
        self.total_win += prize;
        self.picks_remaining -= 1;
        let finished = self.picks_remaining == 0;
        if finished {
            self.active = false;
        }

        Ok(BonusPick {
            slot,
            prize,
            picks_remaining: self.picks_remaining,
            total_win: self.total_win,
            finished,
        })
    }
}

/// Prize for a drawn multiplier index
pub fn prize_for(config: &BonusConfig, bet: f64, index: usize) -> f64 {
    config.prize_multipliers.get(index).copied().unwrap_or(0.0) * bet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_until_finished() {
        let config = BonusConfig::default();
        let mut state = BonusState::start(&config, 10.0);
        assert_eq!(state.revealed.len(), 9);

        let first = state.pick(0, prize_for(&config, 10.0, 0)).unwrap();
        assert_eq!(first.prize, 50.0);
        assert!(!first.finished);

        state.pick(4, 100.0).unwrap();
        let last = state.pick(8, 250.0).unwrap();
        assert!(last.finished);
        assert_eq!(last.total_win, 400.0);
        assert!(!state.active);

        assert_eq!(state.pick(1, 1.0), Err(BonusError::NotActive));
    }

    #[test]
    fn test_pick_errors() {
        let mut state = BonusState::start(&BonusConfig::default(), 1.0);
        state.pick(2, 5.0).unwrap();
        assert_eq!(state.pick(2, 5.0), Err(BonusError::AlreadyPicked(2)));
        assert_eq!(
            state.pick(20, 5.0),
            Err(BonusError::SlotOutOfRange { slot: 20, slots: 9 })
        );
        assert_eq!(state.picks_remaining, 2);
    }
}
