//! Free spins feature

use serde::{Deserialize, Serialize};

use crate::config::FreeSpinConfig;

/// `features.freeSpins`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FreeSpinsState {
    pub active: bool,
    pub remaining: u32,
    /// Spins awarded in this feature, retriggers included
    pub total: u32,
    pub total_win: f64,
    pub multiplier: f64,
}

impl Default for FreeSpinsState {
    fn default() -> Self {
        Self::idle(1.0)
    }
}

impl FreeSpinsState {
    pub fn idle(multiplier: f64) -> Self {
        Self {
            active: false,
            remaining: 0,
            total: 0,
            total_win: 0.0,
            multiplier,
        }
    }

    /// Add spins; returns `true` when this was a retrigger
    pub fn award(&mut self, spins: u32, multiplier: f64) -> bool {
        let retrigger = self.active;
        if !retrigger {
            self.total = 0;
            self.total_win = 0.0;
            self.multiplier = multiplier;
        }
        self.active = true;
        self.remaining += spins;
        self.total += spins;
        retrigger
    }

    /// Use one spin; `false` if none were left
    pub fn consume(&mut self) -> bool {
        if !self.active || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn record_win(&mut self, win: f64) {
        self.total_win += win;
    }

    /// Whether another free spin should run
    pub fn has_spins(&self) -> bool {
        self.active && self.remaining > 0
    }

    /// End the feature, returning what it paid in total
    pub fn finish(&mut self) -> f64 {
        let total = self.total_win;
        self.active = false;
        self.remaining = 0;
        total
    }
}

/// Spins awarded for a scatter count: the largest configured count not
/// above it, nothing below the smallest
pub fn spins_for(config: &FreeSpinConfig, scatter_count: u32) -> Option<u32> {
    config
        .awards
        .range(..=scatter_count)
        .next_back()
        .map(|(_, spins)| *spins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_table() {
        let config = FreeSpinConfig::default();
        assert_eq!(spins_for(&config, 2), None);
        assert_eq!(spins_for(&config, 3), Some(10));
        assert_eq!(spins_for(&config, 4), Some(15));
        assert_eq!(spins_for(&config, 5), Some(20));
        assert_eq!(spins_for(&config, 9), Some(20));
    }

    #[test]
    fn test_award_and_retrigger() {
        let mut state = FreeSpinsState::idle(2.0);
        assert!(!state.award(10, 2.0));
        assert!(state.consume());
        assert_eq!(state.remaining, 9);

        assert!(state.award(15, 2.0));
        assert_eq!(state.remaining, 24);
        assert_eq!(state.total, 25);
    }

    #[test]
    fn test_consume_until_empty() {
        let mut state = FreeSpinsState::idle(2.0);
        state.award(2, 2.0);
        state.record_win(30.0);
        assert!(state.consume());
        assert!(state.consume());
        assert!(!state.consume());
        assert!(!state.has_spins());
        assert_eq!(state.finish(), 30.0);
        assert!(!state.active);
    }

    #[test]
    fn test_state_tree_shape() {
        let value = serde_json::to_value(FreeSpinsState::idle(2.0)).unwrap();
        assert_eq!(value["totalWin"], serde_json::json!(0.0));
        assert_eq!(value["remaining"], serde_json::json!(0));
    }
}
