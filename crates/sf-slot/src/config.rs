//! Slot game configuration
//!
//! Everything the engine treats as a load-time constant: grid shape, bets,
//! symbols and their payout tables, paylines, feature rules, progression and
//! timing. [`GameConfig::default`] is the reference game (5×3, 11 symbols,
//! 10 paylines). Configs can be loaded from YAML or JSON and are always run
//! through [`GameConfig::validate`], which reports every problem at once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::timing::TimingProfile;

// ═══════════════════════════════════════════════════════════════════════════════
// SYMBOLS
// ═══════════════════════════════════════════════════════════════════════════════

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Regular paying symbol
    Regular,
    /// Substitutes for an established regular symbol
    Wild,
    /// Pays anywhere on the grid, awards free spins
    Scatter,
    /// Triggers the pick bonus when landed on paylines
    Bonus,
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDef {
    /// Unique name (e.g. "CHERRY", "WILD")
    pub name: String,
    pub kind: SymbolKind,
    /// Rarity weight; a higher weight makes the symbol rarer
    pub weight: u32,
    /// Reels the symbol may land on (`None` = every reel)
    #[serde(default)]
    pub reels: Option<Vec<usize>>,
    /// Match count → credit multiplier
    #[serde(default)]
    pub payouts: BTreeMap<u32, f64>,
    /// Optional grouping label ("low", "premium", ...)
    #[serde(default)]
    pub tier: Option<String>,
}

impl SymbolDef {
    /// Regular symbol paying on 3, 4 and 5 of a kind
    pub fn regular(name: &str, weight: u32, pays: [f64; 3], tier: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Regular,
            weight,
            reels: None,
            payouts: [(3, pays[0]), (4, pays[1]), (5, pays[2])].into_iter().collect(),
            tier: Some(tier.to_string()),
        }
    }

    /// Special symbol (wild, scatter, bonus) with no payouts
    pub fn special(name: &str, kind: SymbolKind, weight: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            weight,
            reels: None,
            payouts: BTreeMap::new(),
            tier: Some("special".to_string()),
        }
    }

    /// Restrict to the given reels
    pub fn on_reels(mut self, reels: &[usize]) -> Self {
        self.reels = Some(reels.to_vec());
        self
    }

    /// Replace the payout table
    pub fn with_payouts(mut self, payouts: &[(u32, f64)]) -> Self {
        self.payouts = payouts.iter().copied().collect();
        self
    }
}

/// Reference symbol set
pub fn reference_symbols() -> Vec<SymbolDef> {
    vec![
        SymbolDef::regular("CHERRY", 2, [2.0, 5.0, 10.0], "low"),
        SymbolDef::regular("LEMON", 2, [3.0, 8.0, 15.0], "low"),
        SymbolDef::regular("GRAPE", 3, [5.0, 10.0, 25.0], "low"),
        SymbolDef::regular("BELL", 4, [8.0, 20.0, 50.0], "medium"),
        SymbolDef::regular("BAR", 5, [10.0, 30.0, 75.0], "medium"),
        SymbolDef::regular("SEVEN", 8, [20.0, 50.0, 100.0], "high"),
        SymbolDef::regular("DIAMOND", 10, [25.0, 75.0, 150.0], "premium"),
        SymbolDef::regular("CROWN", 12, [30.0, 100.0, 200.0], "premium"),
        SymbolDef::special("WILD", SymbolKind::Wild, 15).on_reels(&[1, 2, 3]),
        SymbolDef::special("SCATTER", SymbolKind::Scatter, 15)
            .with_payouts(&[(3, 5.0), (4, 20.0), (5, 50.0)]),
        SymbolDef::special("BONUS", SymbolKind::Bonus, 18).on_reels(&[0, 2, 4]),
    ]
}

/// Reference paylines for a 5×3 grid (row index per reel, index 0 = middle)
pub fn reference_paylines() -> Vec<Vec<usize>> {
    vec![
        vec![1, 1, 1, 1, 1], // Middle
        vec![0, 0, 0, 0, 0], // Top
        vec![2, 2, 2, 2, 2], // Bottom
        vec![0, 1, 2, 1, 0], // V
        vec![2, 1, 0, 1, 2], // Inverted V
        vec![0, 0, 1, 2, 2],
        vec![2, 2, 1, 0, 0],
        vec![1, 0, 0, 0, 1],
        vec![1, 2, 2, 2, 1],
        vec![0, 1, 0, 1, 0], // W
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Grid shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub reels: usize,
    pub rows: usize,
    /// Length of each generated reel strip
    pub symbols_per_reel: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            reels: 5,
            rows: 3,
            symbols_per_reel: 30,
        }
    }
}

/// Bet ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetConfig {
    pub options: Vec<f64>,
    pub default_index: usize,
}

impl Default for BetConfig {
    fn default() -> Self {
        Self {
            options: vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0],
            default_index: 3,
        }
    }
}

impl BetConfig {
    pub fn default_bet(&self) -> f64 {
        self.options.get(self.default_index).copied().unwrap_or(0.0)
    }
}

/// Scatter rules (the payout table lives on the scatter symbol)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    pub min_count: u32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self { min_count: 3 }
    }
}

/// Cascade (tumble) rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub enabled: bool,
    /// Multiplier ladder, indexed by cascade count (clamped to the last entry)
    pub multipliers: Vec<f64>,
    /// Hard ceiling on iterations per spin
    pub max_iterations: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multipliers: vec![1.0, 2.0, 3.0, 5.0, 8.0],
            max_iterations: 10,
        }
    }
}

/// Free spin awards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeSpinConfig {
    /// Scatter count → spins awarded
    pub awards: BTreeMap<u32, u32>,
    /// Win multiplier applied during free spins
    pub multiplier: f64,
}

impl Default for FreeSpinConfig {
    fn default() -> Self {
        Self {
            awards: [(3, 10), (4, 15), (5, 20)].into_iter().collect(),
            multiplier: 2.0,
        }
    }
}

/// Pick bonus rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    /// BONUS symbols on paylines needed to trigger
    pub min_symbols: u32,
    /// Picks per bonus game
    pub picks: u32,
    /// Number of pickable slots
    pub slots: usize,
    /// Prize pool, each entry × bet
    pub prize_multipliers: Vec<f64>,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            min_symbols: 3,
            picks: 3,
            slots: 9,
            prize_multipliers: vec![5.0, 10.0, 15.0, 20.0, 25.0, 50.0],
        }
    }
}

/// Double-or-nothing gamble rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GambleConfig {
    pub max_rounds: u32,
    /// Probability of guessing the color right
    pub win_chance: f64,
    /// Auto-collect countdown for a gamble offer
    pub countdown_secs: u64,
}

impl Default for GambleConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            win_chance: 0.5,
            countdown_secs: 10,
        }
    }
}

/// What a daily challenge counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeGoal {
    /// Number of spins played
    Spins,
    /// Credits won
    WinCredits,
    /// Free spin features triggered
    TriggerFreeSpins,
}

/// One daily challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallengeDef {
    pub id: String,
    pub goal: ChallengeGoal,
    pub target: f64,
    pub reward: f64,
}

/// Levels, unlocks and daily challenges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// XP per credit wagered
    pub xp_per_credit: f64,
    /// XP needed to leave level `n` is `xp_base × n`
    pub xp_base: f64,
    /// Credits paid on level-up, × the new level
    pub level_up_bonus: f64,
    /// Feature → level it unlocks at (features not listed are always available)
    pub unlocks: BTreeMap<String, u32>,
    /// Win ratio (× bet) counting as a big win
    pub big_win_ratio: f64,
    pub daily_challenges: Vec<DailyChallengeDef>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_per_credit: 1.0,
            xp_base: 100.0,
            level_up_bonus: 50.0,
            unlocks: [
                ("turbo".to_string(), 1),
                ("autoplay".to_string(), 2),
                ("gamble".to_string(), 3),
                ("maxBet".to_string(), 5),
            ]
            .into_iter()
            .collect(),
            big_win_ratio: 20.0,
            daily_challenges: vec![
                DailyChallengeDef {
                    id: "spin_50".into(),
                    goal: ChallengeGoal::Spins,
                    target: 50.0,
                    reward: 100.0,
                },
                DailyChallengeDef {
                    id: "win_500".into(),
                    goal: ChallengeGoal::WinCredits,
                    target: 500.0,
                    reward: 200.0,
                },
                DailyChallengeDef {
                    id: "free_spins_1".into(),
                    goal: ChallengeGoal::TriggerFreeSpins,
                    target: 1.0,
                    reward: 150.0,
                },
            ],
        }
    }
}

/// Reel-reveal anticipation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnticipationConfig {
    pub enabled: bool,
    /// Scatters on revealed reels that start anticipation
    pub trigger_count: u32,
}

impl Default for AnticipationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_count: 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GAME CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid: GridConfig,
    pub bets: BetConfig,
    pub starting_credits: f64,
    /// `payout = table[count] × bet / payout_divisor`
    pub payout_divisor: f64,
    pub symbols: Vec<SymbolDef>,
    pub paylines: Vec<Vec<usize>>,
    pub scatter: ScatterConfig,
    pub cascade: CascadeConfig,
    pub free_spins: FreeSpinConfig,
    pub bonus: BonusConfig,
    pub gamble: GambleConfig,
    pub progression: ProgressionConfig,
    pub anticipation: AnticipationConfig,
    pub timing: TimingProfile,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            bets: BetConfig::default(),
            starting_credits: 1000.0,
            payout_divisor: 1.0,
            symbols: reference_symbols(),
            paylines: reference_paylines(),
            scatter: ScatterConfig::default(),
            cascade: CascadeConfig::default(),
            free_spins: FreeSpinConfig::default(),
            bonus: BonusConfig::default(),
            gamble: GambleConfig::default(),
            progression: ProgressionConfig::default(),
            anticipation: AnticipationConfig::default(),
            timing: TimingProfile::Normal,
        }
    }
}

impl GameConfig {
    /// Reference game with zero presentation delays
    pub fn studio() -> Self {
        Self {
            timing: TimingProfile::Studio,
            ..Self::default()
        }
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        log::info!(
            "[Config] loaded {:?}: {}x{}, {} symbols, {} paylines",
            path,
            config.grid.reels,
            config.grid.rows,
            config.symbols.len(),
            config.paylines.len()
        );
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every rule and report all violations together
    pub fn validate(&self) -> ConfigResult<()> {
        let mut v = Vec::new();

        // Grid
        if self.grid.reels == 0 {
            v.push("grid.reels must be at least 1".to_string());
        }
        if self.grid.rows == 0 {
            v.push("grid.rows must be at least 1".to_string());
        }
        if self.grid.symbols_per_reel < self.grid.rows {
            v.push(format!(
                "grid.symbols_per_reel ({}) must be >= grid.rows ({})",
                self.grid.symbols_per_reel, self.grid.rows
            ));
        }

        // Bets
        if self.bets.options.is_empty() {
            v.push("bets.options must not be empty".to_string());
        }
        for (i, bet) in self.bets.options.iter().enumerate() {
            if !bet.is_finite() || *bet <= 0.0 {
                v.push(format!("bets.options[{i}] must be a positive number, got {bet}"));
            }
        }
        if self.bets.default_index >= self.bets.options.len() {
            v.push(format!(
                "bets.default_index {} out of range for {} options",
                self.bets.default_index,
                self.bets.options.len()
            ));
        }
        if !self.starting_credits.is_finite() || self.starting_credits < 0.0 {
            v.push(format!("starting_credits must be >= 0, got {}", self.starting_credits));
        }
        if !self.payout_divisor.is_finite() || self.payout_divisor <= 0.0 {
            v.push(format!("payout_divisor must be > 0, got {}", self.payout_divisor));
        }

        self.validate_symbols(&mut v);
        self.validate_paylines(&mut v);

        // Features
        if self.scatter.min_count == 0 {
            v.push("scatter.min_count must be at least 1".to_string());
        }
        if self.cascade.multipliers.is_empty() {
            v.push("cascade.multipliers must not be empty".to_string());
        }
        if self.cascade.multipliers.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            v.push("cascade.multipliers must all be > 0".to_string());
        }
        if self.cascade.max_iterations == 0 {
            v.push("cascade.max_iterations must be at least 1".to_string());
        }
        if !self.free_spins.multiplier.is_finite() || self.free_spins.multiplier <= 0.0 {
            v.push("free_spins.multiplier must be > 0".to_string());
        }
        if self.free_spins.awards.values().any(|spins| *spins == 0) {
            v.push("free_spins.awards must award at least one spin".to_string());
        }
        if self.bonus.min_symbols == 0 {
            v.push("bonus.min_symbols must be at least 1".to_string());
        }
        if self.bonus.picks == 0 {
            v.push("bonus.picks must be at least 1".to_string());
        }
        if self.bonus.slots < self.bonus.picks as usize {
            v.push(format!(
                "bonus.slots ({}) must be >= bonus.picks ({})",
                self.bonus.slots, self.bonus.picks
            ));
        }
        if self.bonus.prize_multipliers.is_empty() {
            v.push("bonus.prize_multipliers must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.gamble.win_chance) {
            v.push(format!("gamble.win_chance must be in [0, 1], got {}", self.gamble.win_chance));
        }
        if self.gamble.max_rounds == 0 {
            v.push("gamble.max_rounds must be at least 1".to_string());
        }
        if !self.progression.xp_base.is_finite() || self.progression.xp_base <= 0.0 {
            v.push("progression.xp_base must be > 0".to_string());
        }
        if self.anticipation.trigger_count == 0 {
            v.push("anticipation.trigger_count must be at least 1".to_string());
        }

        if v.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { violations: v })
        }
    }

    fn validate_symbols(&self, v: &mut Vec<String>) {
        if self.symbols.is_empty() {
            v.push("symbols must not be empty".to_string());
            return;
        }
        if self.symbols.len() > u16::MAX as usize {
            v.push(format!("too many symbols ({})", self.symbols.len()));
        }

        let mut names = BTreeSet::new();
        for sym in &self.symbols {
            if !names.insert(sym.name.as_str()) {
                v.push(format!("duplicate symbol name {:?}", sym.name));
            }
            if sym.weight == 0 {
                v.push(format!("symbol {} has zero weight", sym.name));
            }
            if let Some(reels) = &sym.reels {
                if reels.is_empty() {
                    v.push(format!("symbol {} is allowed on no reels", sym.name));
                }
                for reel in reels {
                    if *reel >= self.grid.reels {
                        v.push(format!("symbol {} lists reel {} of {}", sym.name, reel, self.grid.reels));
                    }
                }
            }
            if matches!(sym.kind, SymbolKind::Regular | SymbolKind::Scatter) && sym.payouts.is_empty() {
                v.push(format!("symbol {} has no payout table", sym.name));
            }
            for (count, pay) in &sym.payouts {
                if *count == 0 || *count as usize > self.grid.reels.max(self.grid.reels * self.grid.rows) {
                    v.push(format!("symbol {} pays on impossible count {}", sym.name, count));
                }
                if !pay.is_finite() || *pay < 0.0 {
                    v.push(format!("symbol {} pays {} for {}", sym.name, pay, count));
                }
            }
        }

        if !self.symbols.iter().any(|s| s.kind == SymbolKind::Regular) {
            v.push("at least one regular symbol is required".to_string());
        }
        for reel in 0..self.grid.reels {
            let allowed = self
                .symbols
                .iter()
                .any(|s| s.weight > 0 && s.reels.as_ref().is_none_or(|r| r.contains(&reel)));
            if !allowed {
                v.push(format!("reel {reel} has no allowed symbols"));
            }
        }
    }

    fn validate_paylines(&self, v: &mut Vec<String>) {
        if self.paylines.is_empty() {
            v.push("paylines must not be empty".to_string());
        }
        for (i, line) in self.paylines.iter().enumerate() {
            if line.len() != self.grid.reels {
                v.push(format!(
                    "payline {} has {} positions, expected {}",
                    i,
                    line.len(),
                    self.grid.reels
                ));
            }
            if let Some(row) = line.iter().find(|r| **r >= self.grid.rows) {
                v.push(format!("payline {} uses row {} of {}", i, row, self.grid.rows));
            }
        }
    }

    /// Level a feature unlocks at, `None` when it is always available
    pub fn unlock_level(&self, feature: &str) -> Option<u32> {
        self.progression.unlocks.get(feature).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config_is_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.symbols.len(), 11);
        assert_eq!(config.paylines.len(), 10);
        assert_eq!(config.paylines[0], vec![1, 1, 1, 1, 1]);
        assert_eq!(config.bets.default_bet(), 10.0);
    }

    #[test]
    fn test_validation_aggregates_violations() {
        let mut config = GameConfig::default();
        config.paylines[2] = vec![1, 1, 1];
        config.paylines[4] = vec![0, 0, 0, 0, 7];
        config.symbols[0].payouts.clear();
        config.bets.default_index = 99;
        config.cascade.max_iterations = 0;

        let err = config.validate().unwrap_err();
        let ConfigError::Invalid { violations } = err else {
            panic!("expected aggregated violations");
        };
        assert_eq!(violations.len(), 5, "{violations:?}");
        assert!(violations.iter().any(|m| m.contains("payline 2")));
        assert!(violations.iter().any(|m| m.contains("payline 4")));
        assert!(violations.iter().any(|m| m.contains("CHERRY")));
    }

    #[test]
    fn test_reel_without_symbols_is_rejected() {
        let mut config = GameConfig::default();
        for sym in &mut config.symbols {
            sym.reels = Some(vec![0, 1, 2, 3]);
        }
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reel 4 has no allowed symbols"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = GameConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = GameConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json_str(
            r#"{ "starting_credits": 250, "cascade": { "max_iterations": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.starting_credits, 250.0);
        assert_eq!(config.cascade.max_iterations, 4);
        assert_eq!(config.cascade.multipliers, vec![1.0, 2.0, 3.0, 5.0, 8.0]);
        assert_eq!(config.symbols.len(), 11);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("game.json");
        std::fs::write(&json_path, r#"{ "payout_divisor": 10 }"#).unwrap();
        assert_eq!(GameConfig::load(&json_path).unwrap().payout_divisor, 10.0);

        let yaml_path = dir.path().join("game.yml");
        std::fs::write(&yaml_path, "starting_credits: 42\n").unwrap();
        assert_eq!(GameConfig::load(&yaml_path).unwrap().starting_credits, 42.0);

        let toml_path = dir.path().join("game.toml");
        std::fs::write(&toml_path, "").unwrap();
        assert!(matches!(
            GameConfig::load(&toml_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
