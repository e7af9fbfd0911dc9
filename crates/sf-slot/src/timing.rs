//! Timing profiles for presentation delays
//!
//! The engine never sleeps on its own: every wait goes through the
//! [`crate::TimerRegistry`] with a duration taken from the active
//! [`TimingConfig`]. Studio timing is all zeros so tests and simulations run
//! without waiting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named presets for [`TimingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    #[default]
    Normal,
    Turbo,
    /// Zero delays, for tests and simulations
    Studio,
}

/// Presentation delays, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub profile: TimingProfile,

    /// Until the first reel stops
    pub first_stop_ms: f64,

    /// Between consecutive reel stops
    pub stop_stagger_ms: f64,

    /// Added per anticipated reel
    pub anticipation_ms: f64,

    /// Win celebration hold
    pub win_reveal_ms: f64,

    pub cascade_step_ms: f64,
    pub free_spin_gap_ms: f64,
    pub autoplay_gap_ms: f64,
}

impl TimingConfig {
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            first_stop_ms: 800.0,
            stop_stagger_ms: 300.0,
            anticipation_ms: 1500.0,
            win_reveal_ms: 350.0,
            cascade_step_ms: 550.0,
            free_spin_gap_ms: 1000.0,
            autoplay_gap_ms: 500.0,
        }
    }

    /// Roughly half of normal
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            first_stop_ms: 450.0,
            stop_stagger_ms: 120.0,
            anticipation_ms: 700.0,
            win_reveal_ms: 150.0,
            cascade_step_ms: 250.0,
            free_spin_gap_ms: 400.0,
            autoplay_gap_ms: 250.0,
        }
    }

    pub fn studio() -> Self {
        Self {
            profile: TimingProfile::Studio,
            first_stop_ms: 0.0,
            stop_stagger_ms: 0.0,
            anticipation_ms: 0.0,
            win_reveal_ms: 0.0,
            cascade_step_ms: 0.0,
            free_spin_gap_ms: 0.0,
            autoplay_gap_ms: 0.0,
        }
    }

    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Studio => Self::studio(),
        }
    }

    /// Total time until every reel has stopped, anticipation included
    pub fn spin_duration(&self, reel_count: usize, anticipated_reels: usize) -> Duration {
        let stops = reel_count.saturating_sub(1) as f64 * self.stop_stagger_ms;
        let anticipation = anticipated_reels as f64 * self.anticipation_ms;
        millis(self.first_stop_ms + stops + anticipation)
    }

    pub fn win_reveal(&self) -> Duration {
        millis(self.win_reveal_ms)
    }

    pub fn cascade_step(&self) -> Duration {
        millis(self.cascade_step_ms)
    }

    pub fn free_spin_delay(&self) -> Duration {
        millis(self.free_spin_gap_ms)
    }

    pub fn autoplay_delay(&self) -> Duration {
        millis(self.autoplay_gap_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}

fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_duration() {
        let normal = TimingConfig::default();
        assert_eq!(normal.spin_duration(5, 0), Duration::from_millis(2000));
        assert_eq!(normal.spin_duration(5, 2), Duration::from_millis(5000));
    }

    #[test]
    fn test_turbo_is_faster() {
        let (normal, turbo) = (TimingConfig::normal(), TimingConfig::turbo());
        assert!(turbo.spin_duration(5, 1) < normal.spin_duration(5, 1));
        assert!(turbo.cascade_step() < normal.cascade_step());
    }

    #[test]
    fn test_studio_is_instant() {
        let studio = TimingConfig::from_profile(TimingProfile::Studio);
        assert!(studio.spin_duration(5, 3).is_zero());
        assert!(studio.free_spin_delay().is_zero());
        assert!(studio.cascade_step().is_zero());
    }
}
