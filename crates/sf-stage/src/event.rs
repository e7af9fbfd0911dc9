//! GameEvent — the typed moments of a game session
//!
//! Events describe what happened, never how it is shown. Presentation,
//! audio and analytics layers subscribe to event kinds on the [`EventBus`].
//!
//! [`EventBus`]: crate::EventBus

use serde::{Deserialize, Serialize};

use sf_core::Position;

/// Severity of a player-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Every event the slot core emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin accepted, stake taken (or a free spin consumed)
    SpinStarted {
        spin_id: u64,
        bet: f64,
        free_spin: bool,
    },

    /// Reel positions chosen; `anticipation` lists reels to dramatize
    ReelsStopped {
        spin_id: u64,
        positions: Vec<usize>,
        anticipation: Vec<usize>,
    },

    /// Base evaluation finished
    WinEvaluated {
        spin_id: u64,
        amount: f64,
        lines: Vec<usize>,
        scatter_count: u32,
    },

    /// Spin settled and the game is idle again
    SpinEnded { spin_id: u64, total_win: f64 },

    /// Spin pipeline failed and was rolled back
    SpinFailed {
        spin_id: u64,
        reason: String,
        refunded: f64,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // CASCADES
    // ═══════════════════════════════════════════════════════════════════════
    /// One cascade iteration paid
    CascadeStep {
        step: u32,
        multiplier: f64,
        win: f64,
        positions: Vec<Position>,
    },

    /// Cascade chain finished
    CascadeEnded { steps: u32, total_win: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // FEATURES
    // ═══════════════════════════════════════════════════════════════════════
    FreeSpinsAwarded { spins: u32, retrigger: bool },

    FreeSpinsEnded { total_win: f64 },

    BonusTriggered { picks: u32, lines: Vec<usize> },

    BonusPicked { slot: usize, prize: f64 },

    BonusEnded { total_win: f64 },

    GambleOffered { stake: f64 },

    GambleResolved { won: bool, pending: f64, round: u32 },

    GambleCollected { amount: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // PROGRESSION
    // ═══════════════════════════════════════════════════════════════════════
    LevelUp { level: u32, bonus: f64 },

    AchievementUnlocked { id: String },

    ChallengeCompleted { id: String, reward: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // PLAYER MESSAGES
    // ═══════════════════════════════════════════════════════════════════════
    /// User-visible message (insufficient credits, refunds, ...)
    Message { level: MessageLevel, text: String },
}

/// Discriminant of [`GameEvent`], used to register handlers by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SpinStarted,
    ReelsStopped,
    WinEvaluated,
    SpinEnded,
    SpinFailed,
    CascadeStep,
    CascadeEnded,
    FreeSpinsAwarded,
    FreeSpinsEnded,
    BonusTriggered,
    BonusPicked,
    BonusEnded,
    GambleOffered,
    GambleResolved,
    GambleCollected,
    LevelUp,
    AchievementUnlocked,
    ChallengeCompleted,
    Message,
}

impl GameEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::SpinStarted { .. } => EventKind::SpinStarted,
            GameEvent::ReelsStopped { .. } => EventKind::ReelsStopped,
            GameEvent::WinEvaluated { .. } => EventKind::WinEvaluated,
            GameEvent::SpinEnded { .. } => EventKind::SpinEnded,
            GameEvent::SpinFailed { .. } => EventKind::SpinFailed,
            GameEvent::CascadeStep { .. } => EventKind::CascadeStep,
            GameEvent::CascadeEnded { .. } => EventKind::CascadeEnded,
            GameEvent::FreeSpinsAwarded { .. } => EventKind::FreeSpinsAwarded,
            GameEvent::FreeSpinsEnded { .. } => EventKind::FreeSpinsEnded,
            GameEvent::BonusTriggered { .. } => EventKind::BonusTriggered,
            GameEvent::BonusPicked { .. } => EventKind::BonusPicked,
            GameEvent::BonusEnded { .. } => EventKind::BonusEnded,
            GameEvent::GambleOffered { .. } => EventKind::GambleOffered,
            GameEvent::GambleResolved { .. } => EventKind::GambleResolved,
            GameEvent::GambleCollected { .. } => EventKind::GambleCollected,
            GameEvent::LevelUp { .. } => EventKind::LevelUp,
            GameEvent::AchievementUnlocked { .. } => EventKind::AchievementUnlocked,
            GameEvent::ChallengeCompleted { .. } => EventKind::ChallengeCompleted,
            GameEvent::Message { .. } => EventKind::Message,
        }
    }

    /// Convenience constructor for player messages
    pub fn message(level: MessageLevel, text: impl Into<String>) -> Self {
        GameEvent::Message {
            level,
            text: text.into(),
        }
    }

    /// Snake-case type name, matches the serialized `type` tag
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            EventKind::SpinStarted => "spin_started",
            EventKind::ReelsStopped => "reels_stopped",
            EventKind::WinEvaluated => "win_evaluated",
            EventKind::SpinEnded => "spin_ended",
            EventKind::SpinFailed => "spin_failed",
            EventKind::CascadeStep => "cascade_step",
            EventKind::CascadeEnded => "cascade_ended",
            EventKind::FreeSpinsAwarded => "free_spins_awarded",
            EventKind::FreeSpinsEnded => "free_spins_ended",
            EventKind::BonusTriggered => "bonus_triggered",
            EventKind::BonusPicked => "bonus_picked",
            EventKind::BonusEnded => "bonus_ended",
            EventKind::GambleOffered => "gamble_offered",
            EventKind::GambleResolved => "gamble_resolved",
            EventKind::GambleCollected => "gamble_collected",
            EventKind::LevelUp => "level_up",
            EventKind::AchievementUnlocked => "achievement_unlocked",
            EventKind::ChallengeCompleted => "challenge_completed",
            EventKind::Message => "message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_tag() {
        let event = GameEvent::SpinEnded {
            spin_id: 3,
            total_win: 12.5,
        };
        assert_eq!(event.kind(), EventKind::SpinEnded);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.type_name());
    }

    #[test]
    fn test_message_constructor() {
        let event = GameEvent::message(MessageLevel::Warning, "Insufficient credits");
        match event {
            GameEvent::Message { level, text } => {
                assert_eq!(level, MessageLevel::Warning);
                assert_eq!(text, "Insufficient credits");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
