//! Player progression
//!
//! Levels from XP earned on wagers, feature unlocks by level, one-time
//! achievements, daily challenges and lifetime statistics. Everything here is
//! plain data plus pure bookkeeping; the engine feeds it one [`SpinRecord`]
//! per settled spin and applies the returned [`ProgressReport`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{ChallengeGoal, ProgressionConfig};

/// Achievement ids
pub mod achievements {
    pub const FIRST_WIN: &str = "first_win";
    pub const BIG_WIN: &str = "big_win";
    pub const FREE_SPINS: &str = "free_spins";
    pub const BONUS_GAME: &str = "bonus_game";
    pub const CASCADE_CHAIN: &str = "cascade_chain";
    pub const SPINS_100: &str = "spins_100";
    pub const LEVEL_5: &str = "level_5";
}

const CASCADE_CHAIN_MIN: u32 = 3;
const SPIN_MILESTONE: u64 = 100;
const LEVEL_MILESTONE: u32 = 5;

/// Lifetime statistics (`stats`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_spins: u64,
    pub total_wagered: f64,
    pub total_won: f64,
    pub biggest_win: f64,
    pub wins: u64,
    pub free_spins_played: u64,
    pub bonus_games: u64,
    pub cascades: u64,
}

impl Stats {
    pub fn record(&mut self, spin: &SpinRecord) {
        self.total_spins += 1;
        if spin.paid {
            self.total_wagered += spin.bet;
        } else {
            self.free_spins_played += 1;
        }
        if spin.win > 0.0 {
            self.wins += 1;
            self.total_won += spin.win;
            self.biggest_win = self.biggest_win.max(spin.win);
        }
        if spin.bonus_triggered {
            self.bonus_games += 1;
        }
        self.cascades += spin.cascade_count as u64;
    }

    /// Return to player so far
    pub fn rtp(&self) -> f64 {
        if self.total_wagered > 0.0 {
            self.total_won / self.total_wagered
        } else {
            0.0
        }
    }
}

/// Daily challenge progress (`progression.daily`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyState {
    /// Day the progress belongs to
    pub day: Option<NaiveDate>,
    pub progress: BTreeMap<String, f64>,
    pub completed: Vec<String>,
}

impl DailyState {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Some(day),
            ..Self::default()
        }
    }

    /// Reset when `today` is a different day. Returns whether it reset.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.day == Some(today) {
            return false;
        }
        *self = Self::new(today);
        true
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.iter().any(|c| c == id)
    }
}

/// Level, XP, unlocks and achievements (`progression`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionState {
    pub level: u32,
    pub xp: f64,
    pub unlocked: Vec<String>,
    pub achievements: Vec<String>,
    pub daily: DailyState,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0.0,
            unlocked: Vec::new(),
            achievements: Vec::new(),
            daily: DailyState::default(),
        }
    }
}

/// What one settled spin contributes to progression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpinRecord {
    pub bet: f64,
    pub win: f64,
    /// Paid spin (free spins earn no XP)
    pub paid: bool,
    pub free_spins_triggered: bool,
    pub bonus_triggered: bool,
    pub cascade_count: u32,
}

/// A level gained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUp {
    pub level: u32,
    pub bonus: f64,
}

/// Everything that changed because of one spin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressReport {
    pub level_ups: Vec<LevelUp>,
    pub newly_unlocked: Vec<String>,
    pub achievements: Vec<String>,
    /// `(challenge id, reward)`
    pub challenges: Vec<(String, f64)>,
}

impl ProgressReport {
    /// Credits owed to the player
    pub fn credit_bonus(&self) -> f64 {
        self.level_ups.iter().map(|l| l.bonus).sum::<f64>()
            + self.challenges.iter().map(|(_, reward)| reward).sum::<f64>()
    }

    pub fn is_empty(&self) -> bool {
        self.level_ups.is_empty()
            && self.newly_unlocked.is_empty()
            && self.achievements.is_empty()
            && self.challenges.is_empty()
    }
}

/// Features available at `level` (unlisted features are always available)
pub fn unlocked_at(config: &ProgressionConfig, level: u32) -> Vec<String> {
    config
        .unlocks
        .iter()
        .filter(|(_, required)| **required <= level)
        .map(|(feature, _)| feature.clone())
        .collect()
}

impl ProgressionState {
    /// Level 1 with its unlocks, daily challenges for `today`
    pub fn new(config: &ProgressionConfig, today: NaiveDate) -> Self {
        Self {
            unlocked: unlocked_at(config, 1),
            daily: DailyState::new(today),
            ..Self::default()
        }
    }

    /// XP needed to leave the current level
    pub fn xp_to_next(&self, config: &ProgressionConfig) -> f64 {
        config.xp_base * self.level as f64
    }

    pub fn is_unlocked(&self, config: &ProgressionConfig, feature: &str) -> bool {
        match config.unlocks.get(feature) {
            None => true,
            Some(required) => self.level >= *required || self.unlocked.iter().any(|f| f == feature),
        }
    }

    /// Apply one settled spin. `stats` must already include it.
    pub fn record_spin(
        &mut self,
        config: &ProgressionConfig,
        stats: &Stats,
        spin: &SpinRecord,
        today: NaiveDate,
    ) -> ProgressReport {
        let mut report = ProgressReport::default();

        if spin.paid {
            self.gain_xp(config, spin.bet * config.xp_per_credit, &mut report);
        }
        self.check_achievements(config, stats, spin, &mut report);
        self.advance_daily(config, spin, today, &mut report);

        report
    }

    fn gain_xp(&mut self, config: &ProgressionConfig, xp: f64, report: &mut ProgressReport) {
        if xp <= 0.0 || config.xp_base <= 0.0 {
            return;
        }
        self.xp += xp;
        while self.xp >= self.xp_to_next(config) {
            self.xp -= self.xp_to_next(config);
            self.level += 1;
            report.level_ups.push(LevelUp {
                level: self.level,
                bonus: config.level_up_bonus * self.level as f64,
            });
        }
        for feature in unlocked_at(config, self.level) {
            if !self.unlocked.contains(&feature) {
                self.unlocked.push(feature.clone());
                report.newly_unlocked.push(feature);
            }
        }
    }

    fn check_achievements(
        &mut self,
        config: &ProgressionConfig,
        stats: &Stats,
        spin: &SpinRecord,
        report: &mut ProgressReport,
    ) {
        let earned = [
            (achievements::FIRST_WIN, spin.win > 0.0),
            (
                achievements::BIG_WIN,
                spin.bet > 0.0 && spin.win >= spin.bet * config.big_win_ratio,
            ),
            (achievements::FREE_SPINS, spin.free_spins_triggered),
            (achievements::BONUS_GAME, spin.bonus_triggered),
            (achievements::CASCADE_CHAIN, spin.cascade_count >= CASCADE_CHAIN_MIN),
            (achievements::SPINS_100, stats.total_spins >= SPIN_MILESTONE),
            (achievements::LEVEL_5, self.level >= LEVEL_MILESTONE),
        ];
        for (id, reached) in earned {
            if reached && !self.achievements.iter().any(|a| a == id) {
                self.achievements.push(id.to_string());
                report.achievements.push(id.to_string());
            }
        }
    }

    fn advance_daily(
        &mut self,
        config: &ProgressionConfig,
        spin: &SpinRecord,
        today: NaiveDate,
        report: &mut ProgressReport,
    ) {
        if self.daily.roll_over(today) {
            log::info!("[Progression] daily challenges reset for {}", today);
        }
        for challenge in &config.daily_challenges {
            if self.daily.is_completed(&challenge.id) {
                continue;
            }
            let step = match challenge.goal {
                ChallengeGoal::Spins if spin.paid => 1.0,
                ChallengeGoal::WinCredits => spin.win,
                ChallengeGoal::TriggerFreeSpins if spin.free_spins_triggered => 1.0,
                _ => 0.0,
            };
            if step <= 0.0 {
                continue;
            }
            let progress = self.daily.progress.entry(challenge.id.clone()).or_insert(0.0);
            *progress += step;
            if *progress >= challenge.target {
                self.daily.completed.push(challenge.id.clone());
                report.challenges.push((challenge.id.clone(), challenge.reward));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn paid(bet: f64, win: f64) -> SpinRecord {
        SpinRecord {
            bet,
            win,
            paid: true,
            ..SpinRecord::default()
        }
    }

    fn no_challenges() -> ProgressionConfig {
        ProgressionConfig {
            daily_challenges: Vec::new(),
            ..ProgressionConfig::default()
        }
    }

    #[test]
    fn test_level_up_carries_xp_and_pays_bonus() {
        let config = no_challenges();
        let mut state = ProgressionState::new(&config, day(1));
        assert_eq!(state.unlocked, vec!["turbo".to_string()]);

        // Level 1 needs 100, level 2 needs 200
        let report = state.record_spin(&config, &Stats::default(), &paid(320.0, 0.0), day(1));

        assert_eq!(state.level, 3);
        assert_eq!(state.xp, 20.0);
        assert_eq!(
            report.level_ups,
            vec![
                LevelUp { level: 2, bonus: 100.0 },
                LevelUp { level: 3, bonus: 150.0 }
            ]
        );
        assert_eq!(report.credit_bonus(), 250.0);
        assert_eq!(report.newly_unlocked, vec!["autoplay".to_string(), "gamble".to_string()]);
    }

    #[test]
    fn test_free_spins_earn_no_xp() {
        let config = no_challenges();
        let mut state = ProgressionState::new(&config, day(1));
        let spin = SpinRecord {
            bet: 500.0,
            ..SpinRecord::default()
        };
        let report = state.record_spin(&config, &Stats::default(), &spin, day(1));
        assert_eq!(state.level, 1);
        assert!(report.is_empty());
    }

    #[test]
    fn test_achievements_fire_once() {
        let config = no_challenges();
        let mut state = ProgressionState::new(&config, day(1));
        let spin = SpinRecord {
            cascade_count: 3,
            ..paid(1.0, 25.0)
        };

        let report = state.record_spin(&config, &Stats::default(), &spin, day(1));
        assert_eq!(
            report.achievements,
            vec!["first_win", "big_win", "cascade_chain"]
        );

        let again = state.record_spin(&config, &Stats::default(), &spin, day(1));
        assert!(again.achievements.is_empty());
    }

    #[test]
    fn test_spin_milestone_reads_stats() {
        let config = no_challenges();
        let mut state = ProgressionState::new(&config, day(1));
        let stats = Stats {
            total_spins: 100,
            ..Stats::default()
        };
        let report = state.record_spin(&config, &stats, &paid(1.0, 0.0), day(1));
        assert_eq!(report.achievements, vec!["spins_100"]);
    }

    #[test]
    fn test_daily_challenge_completes_and_resets() {
        let config = ProgressionConfig::default();
        let mut state = ProgressionState::new(&config, day(1));

        let report = state.record_spin(&config, &Stats::default(), &paid(1.0, 300.0), day(1));
        assert!(report.challenges.is_empty());
        let report = state.record_spin(&config, &Stats::default(), &paid(1.0, 250.0), day(1));
        assert_eq!(report.challenges, vec![("win_500".to_string(), 200.0)]);

        // Completed challenges don't pay twice
        let report = state.record_spin(&config, &Stats::default(), &paid(1.0, 600.0), day(1));
        assert!(report.challenges.is_empty());

        // New day, fresh progress
        state.record_spin(&config, &Stats::default(), &paid(1.0, 0.0), day(2));
        assert_eq!(state.daily.day, Some(day(2)));
        assert!(state.daily.completed.is_empty());
        assert_eq!(state.daily.progress.get("spin_50"), Some(&1.0));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = Stats::default();
        stats.record(&paid(10.0, 40.0));
        stats.record(&SpinRecord {
            bet: 10.0,
            win: 5.0,
            cascade_count: 2,
            ..SpinRecord::default()
        });
        assert_eq!(stats.total_spins, 2);
        assert_eq!(stats.total_wagered, 10.0);
        assert_eq!(stats.free_spins_played, 1);
        assert_eq!(stats.biggest_win, 40.0);
        assert_eq!(stats.cascades, 2);
        assert_eq!(stats.rtp(), 4.5);
    }

    #[test]
    fn test_unlock_gating() {
        let config = ProgressionConfig::default();
        let state = ProgressionState::new(&config, day(1));
        assert!(state.is_unlocked(&config, "turbo"));
        assert!(!state.is_unlocked(&config, "gamble"));
        assert!(state.is_unlocked(&config, "cascade"));
    }
}
