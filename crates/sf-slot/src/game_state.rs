//! Game state tree layout
//!
//! ```text
//! game          credits, currentBet, betIndex, isSpinning, lastWin,
//!               reelPositions, spinCount
//! features      freeSpins, bonus, cascade, gamble
//! ui            message, lastWinDisplay, showMultiplier
//! controls      turbo, autoplay { active, remaining }
//! progression   level, xp, unlocked, achievements, daily
//! stats         lifetime statistics
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::GameConfig;
use crate::features::{BonusState, CascadeState, FreeSpinsState, GambleState};
use crate::progression::{ProgressionState, Stats};
use crate::timing::TimingProfile;

/// Store paths used by the engine
pub mod paths {
    pub const GAME: &str = "game";
    pub const CREDITS: &str = "game.credits";
    pub const CURRENT_BET: &str = "game.currentBet";
    pub const BET_INDEX: &str = "game.betIndex";
    pub const IS_SPINNING: &str = "game.isSpinning";
    pub const LAST_WIN: &str = "game.lastWin";
    pub const REEL_POSITIONS: &str = "game.reelPositions";
    pub const SPIN_COUNT: &str = "game.spinCount";

    pub const FEATURES: &str = "features";
    pub const FREE_SPINS: &str = "features.freeSpins";
    pub const BONUS: &str = "features.bonus";
    pub const GAMBLE: &str = "features.gamble";
    pub const CASCADE: &str = "features.cascade";
    pub const CASCADE_ENABLED: &str = "features.cascade.enabled";
    pub const CASCADE_ACTIVE: &str = "features.cascade.active";
    pub const CASCADE_COUNT: &str = "features.cascade.count";
    pub const CASCADE_MULTIPLIER: &str = "features.cascade.multiplier";
    pub const CASCADE_TOTAL_WIN: &str = "features.cascade.totalWin";

    pub const UI_MESSAGE: &str = "ui.message";
    pub const UI_LAST_WIN_DISPLAY: &str = "ui.lastWinDisplay";
    pub const UI_SHOW_MULTIPLIER: &str = "ui.showMultiplier";

    pub const TURBO: &str = "controls.turbo";
    pub const AUTOPLAY: &str = "controls.autoplay";

    pub const PROGRESSION: &str = "progression";
    pub const STATS: &str = "stats";
}

/// `controls.autoplay`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayState {
    pub active: bool,
    pub remaining: u32,
}

/// Fresh tree for a new player
pub fn initial_state(config: &GameConfig, today: NaiveDate) -> Value {
    let cascade = CascadeState {
        enabled: config.cascade.enabled,
        ..CascadeState::default()
    };
    json!({
        "game": {
            "credits": config.starting_credits,
            "currentBet": config.bets.default_bet(),
            "betIndex": config.bets.default_index,
            "isSpinning": false,
            "lastWin": 0.0,
            "reelPositions": vec![0usize; config.grid.reels],
            "spinCount": 0,
        },
        "features": {
            "freeSpins": FreeSpinsState::idle(config.free_spins.multiplier),
            "bonus": BonusState::default(),
            "cascade": cascade,
            "gamble": GambleState::default(),
        },
        "ui": {
            "message": "",
            "lastWinDisplay": 0.0,
            "showMultiplier": false,
        },
        "controls": {
            "turbo": config.timing == TimingProfile::Turbo,
            "autoplay": AutoplayState::default(),
        },
        "progression": ProgressionState::new(&config.progression, today),
        "stats": Stats::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_state::StateStore;

    #[test]
    fn test_initial_state_shape() {
        let config = GameConfig::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let store = StateStore::with_initial(initial_state(&config, today));

        assert_eq!(store.get::<f64>(paths::CREDITS), Some(1000.0));
        assert_eq!(store.get::<f64>(paths::CURRENT_BET), Some(10.0));
        assert_eq!(store.get::<bool>(paths::IS_SPINNING), Some(false));
        assert_eq!(store.get::<Vec<usize>>(paths::REEL_POSITIONS), Some(vec![0; 5]));
        assert_eq!(store.get::<bool>(paths::CASCADE_ENABLED), Some(true));
        assert_eq!(store.get::<f64>("features.freeSpins.multiplier"), Some(2.0));
        assert_eq!(store.get::<u32>("progression.level"), Some(1));
        assert_eq!(store.get::<AutoplayState>(paths::AUTOPLAY), Some(AutoplayState::default()));
        assert_eq!(store.get::<Stats>(paths::STATS), Some(Stats::default()));
    }
}
