//! Save payload
//!
//! [`SaveData`] is what survives between sessions. Loading never fails: a
//! missing document gives a fresh player, and a partial or garbled one keeps
//! every field that still parses and falls back to defaults for the rest.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sf_state::{StateResult, StateStore, UpdateOptions};

use crate::config::GameConfig;
use crate::game_state::{AutoplayState, paths};
use crate::progression::{ProgressionState, Stats};

/// Current save schema
pub const SAVE_VERSION: u32 = 1;

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveSettings {
    pub turbo: bool,
    /// Autoplay spins left when the game was saved
    pub autoplay: u32,
    pub cascade_enabled: bool,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            turbo: false,
            autoplay: 0,
            cascade_enabled: true,
        }
    }
}

/// Persisted player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    pub credits: f64,
    pub current_bet: f64,
    pub bet_index: usize,
    pub unlocked: Vec<String>,
    pub progression: ProgressionState,
    pub stats: Stats,
    pub settings: SaveSettings,
}

impl SaveData {
    /// New player
    pub fn fresh(config: &GameConfig, today: NaiveDate) -> Self {
        let progression = ProgressionState::new(&config.progression, today);
        Self {
            version: SAVE_VERSION,
            saved_at: None,
            credits: config.starting_credits,
            current_bet: config.bets.default_bet(),
            bet_index: config.bets.default_index,
            unlocked: progression.unlocked.clone(),
            progression,
            stats: Stats::default(),
            settings: SaveSettings {
                cascade_enabled: config.cascade.enabled,
                ..SaveSettings::default()
            },
        }
    }

    /// Snapshot the persisted parts of the store
    pub fn capture(store: &StateStore, defaults: &SaveData, now: DateTime<Utc>) -> Self {
        let progression: ProgressionState = store
            .get(paths::PROGRESSION)
            .unwrap_or_else(|| defaults.progression.clone());
        let autoplay: AutoplayState = store.get(paths::AUTOPLAY).unwrap_or_default();
        Self {
            version: SAVE_VERSION,
            saved_at: Some(now),
            credits: store.get(paths::CREDITS).unwrap_or(defaults.credits),
            current_bet: store.get(paths::CURRENT_BET).unwrap_or(defaults.current_bet),
            bet_index: store.get(paths::BET_INDEX).unwrap_or(defaults.bet_index),
            unlocked: progression.unlocked.clone(),
            progression,
            stats: store.get(paths::STATS).unwrap_or_default(),
            settings: SaveSettings {
                turbo: store.get(paths::TURBO).unwrap_or(false),
                autoplay: if autoplay.active { autoplay.remaining } else { 0 },
                cascade_enabled: store
                    .get(paths::CASCADE_ENABLED)
                    .unwrap_or(defaults.settings.cascade_enabled),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a stored document field by field on top of `defaults`
    pub fn parse_lenient(raw: &str, defaults: SaveData) -> SaveData {
        let doc = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                log::warn!("[Save] expected an object, found {}; using defaults", kind_of(&other));
                return defaults;
            }
            Err(e) => {
                log::warn!("[Save] unreadable save ({}); using defaults", e);
                return defaults;
            }
        };

        let mut data = defaults;
        data.version = field(&doc, "version", data.version);
        data.saved_at = field(&doc, "savedAt", data.saved_at);
        data.credits = field(&doc, "credits", data.credits);
        data.current_bet = field(&doc, "currentBet", data.current_bet);
        data.bet_index = field(&doc, "betIndex", data.bet_index);
        data.unlocked = field(&doc, "unlocked", data.unlocked);
        data.progression = field(&doc, "progression", data.progression);
        data.stats = field(&doc, "stats", data.stats);
        data.settings = field(&doc, "settings", data.settings);

        for feature in &data.unlocked {
            if !data.progression.unlocked.contains(feature) {
                data.progression.unlocked.push(feature.clone());
            }
        }
        if data.version > SAVE_VERSION {
            log::warn!("[Save] save schema v{} is newer than v{}", data.version, SAVE_VERSION);
        }
        data
    }

    /// Clamp values into what the config allows
    pub fn sanitize(mut self, config: &GameConfig) -> Self {
        if !self.credits.is_finite() || self.credits < 0.0 {
            log::warn!("[Save] invalid credits {}, resetting", self.credits);
            self.credits = config.starting_credits;
        }
        let options = &config.bets.options;
        let index = options
            .get(self.bet_index)
            .filter(|bet| **bet == self.current_bet)
            .map(|_| self.bet_index)
            .or_else(|| options.iter().position(|bet| *bet == self.current_bet))
            .unwrap_or(config.bets.default_index);
        self.bet_index = index;
        self.current_bet = options.get(index).copied().unwrap_or(0.0);
        if self.progression.level == 0 {
            self.progression.level = 1;
        }
        self
    }

    /// Write the payload into the store in one commit
    pub fn apply(&self, store: &StateStore) -> StateResult<bool> {
        let autoplay = AutoplayState {
            active: false,
            remaining: self.settings.autoplay,
        };
        store.update_many(
            [
                (paths::CREDITS, json!(self.credits)),
                (paths::CURRENT_BET, json!(self.current_bet)),
                (paths::BET_INDEX, json!(self.bet_index)),
                (paths::PROGRESSION, json!(self.progression)),
                (paths::STATS, json!(self.stats)),
                (paths::TURBO, json!(self.settings.turbo)),
                (paths::AUTOPLAY, json!(autoplay)),
                (paths::CASCADE_ENABLED, json!(self.settings.cascade_enabled)),
            ],
            UpdateOptions::default(),
        )
    }
}

fn field<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str, fallback: T) -> T {
    match doc.get(key) {
        None => fallback,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("[Save] ignoring field {:?}: {}", key, e);
                fallback
            }
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
