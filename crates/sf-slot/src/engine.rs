//! Spin orchestration
//!
//! [`SlotGame`] sequences one spin through its phases:
//!
//! ```text
//! Idle → Spinning → Evaluating → FeatureHandling → Settling → Idle
//!            │            │               │
//!            └────────────┴───────────────┴──→ rollback → Idle
//! ```
//!
//! A checkpoint of the game, feature, stats and progression subtrees is taken
//! before the stake is deducted. Any failure before the spin settles restores
//! it, so the player gets the bet back and `isSpinning` is never left set.
//! The only suspension points are presenter calls and timer-registry delays.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sf_core::Grid;
use sf_stage::{EventBus, GameEvent, MessageLevel};
use sf_state::{Checkpoint, Lifecycle, MemoryStorage, SaveStorage, StateStore, UpdateOptions};

use crate::anticipation::anticipation_reels;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::features::{
    BonusError, BonusPick, BonusState, CascadeDeps, CascadeSequencer, FreeSpinsState,
    GambleChoice, GambleDecision, GambleError, GambleRound, GambleState, prize_for, spins_for,
};
use crate::game_state::{AutoplayState, initial_state, paths};
use crate::paytable::PaylineEvaluator;
use crate::persistence::SaveData;
use crate::presenter::Presenter;
use crate::progression::{ProgressReport, ProgressionState, SpinRecord, Stats};
use crate::rng::SymbolGenerator;
use crate::spin::{SpinOutcome, SpinPhase, SpinRejection, SpinResult};
use crate::symbols::{ReelStrip, SymbolSet};
use crate::timers::{AUTOPLAY_TIMER, FREE_SPINS_TIMER, GAMBLE_OFFER_TIMER, SPIN_TIMER, TimerRegistry};
use crate::timing::{TimingConfig, TimingProfile};

/// Subtrees a spin may touch before it settles
const CHECKPOINT_PATHS: &[&str] = &[paths::GAME, paths::FEATURES, paths::STATS, paths::PROGRESSION];

/// Player-facing text after a paid spin rolls back
pub const SPIN_FAILED_MESSAGE: &str = "Spin failed, bet refunded";

/// Player-facing text after a free spin rolls back; the spin is not used up
pub const FREE_SPIN_FAILED_MESSAGE: &str = "Free spin failed, spin kept";

/// Feature names used for level gating
pub mod feature_keys {
    pub const TURBO: &str = "turbo";
    pub const AUTOPLAY: &str = "autoplay";
    pub const GAMBLE: &str = "gamble";
    pub const MAX_BET: &str = "maxBet";
}

/// Everything a [`SlotGame`] runs against
pub struct GameDeps<P: Presenter> {
    pub store: Arc<StateStore>,
    pub events: Arc<EventBus>,
    pub timers: Arc<TimerRegistry>,
    pub presenter: P,
    pub storage: Arc<dyn SaveStorage>,
    /// Fixed RNG seed for reproducible sessions
    pub seed: Option<u64>,
}

impl<P: Presenter> GameDeps<P> {
    /// Fresh store, bus and timers with in-memory saves
    pub fn new(presenter: P) -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            events: Arc::new(EventBus::new()),
            timers: Arc::new(TimerRegistry::new()),
            presenter,
            storage: Arc::new(MemoryStorage::new()),
            seed: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn SaveStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The slot game
pub struct SlotGame<P: Presenter, R: Rng = ChaCha8Rng> {
    config: GameConfig,
    symbols: Arc<SymbolSet>,
    evaluator: PaylineEvaluator,
    generator: SymbolGenerator<R>,
    strips: Vec<ReelStrip>,
    cascade: CascadeSequencer,
    timing: TimingConfig,

    store: Arc<StateStore>,
    events: Arc<EventBus>,
    timers: Arc<TimerRegistry>,
    presenter: P,
    storage: Arc<dyn SaveStorage>,

    phase: SpinPhase,
    next_spin_id: u64,
    forced: VecDeque<Grid>,
    today: Option<NaiveDate>,
}

impl<P: Presenter> SlotGame<P, ChaCha8Rng> {
    /// Build a game; seeded from `deps.seed` or the OS
    pub fn new(config: GameConfig, deps: GameDeps<P>) -> GameResult<Self> {
        let rng = match deps.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self::with_rng(config, deps, rng)
    }
}

impl<P: Presenter, R: Rng> SlotGame<P, R> {
    /// Build a game around a caller-supplied random source
    pub fn with_rng(config: GameConfig, deps: GameDeps<P>, rng: R) -> GameResult<Self> {
        config.validate()?;

        let symbols = Arc::new(SymbolSet::from_defs(&config.symbols));
        let mut generator = SymbolGenerator::new(&symbols, config.grid.reels, rng)?;
        let strips = (0..config.grid.reels)
            .map(|reel| generator.reel_strip(reel, config.grid.symbols_per_reel))
            .collect();
        let evaluator = PaylineEvaluator::new(Arc::clone(&symbols), &config);

        if deps.store.lifecycle() == Lifecycle::Uninitialized {
            deps.store
                .initialize(initial_state(&config, Local::now().date_naive()))?;
        }

        log::info!(
            "[Spin] game ready: {}x{}, {} symbols, {} paylines, {:?} timing",
            config.grid.reels,
            config.grid.rows,
            symbols.len(),
            config.paylines.len(),
            config.timing
        );

        Ok(Self {
            cascade: CascadeSequencer::new(config.cascade.clone()),
            timing: TimingConfig::from_profile(config.timing),
            config,
            symbols,
            evaluator,
            generator,
            strips,
            store: deps.store,
            events: deps.events,
            timers: deps.timers,
            presenter: deps.presenter,
            storage: deps.storage,
            phase: SpinPhase::Idle,
            next_spin_id: 1,
            forced: VecDeque::new(),
            today: None,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn timers(&self) -> &Arc<TimerRegistry> {
        &self.timers
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn evaluator(&self) -> &PaylineEvaluator {
        &self.evaluator
    }

    pub fn strips(&self) -> &[ReelStrip] {
        &self.strips
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn credits(&self) -> f64 {
        self.store.get(paths::CREDITS).unwrap_or(0.0)
    }

    pub fn current_bet(&self) -> f64 {
        self.store
            .get(paths::CURRENT_BET)
            .unwrap_or_else(|| self.config.bets.default_bet())
    }

    pub fn free_spins(&self) -> FreeSpinsState {
        self.store
            .get(paths::FREE_SPINS)
            .unwrap_or_else(|| FreeSpinsState::idle(self.config.free_spins.multiplier))
    }

    pub fn bonus(&self) -> BonusState {
        self.read(paths::BONUS)
    }

    pub fn gamble_state(&self) -> GambleState {
        self.read(paths::GAMBLE)
    }

    pub fn progression(&self) -> ProgressionState {
        self.store
            .get(paths::PROGRESSION)
            .unwrap_or_else(|| ProgressionState::new(&self.config.progression, self.today()))
    }

    pub fn stats(&self) -> Stats {
        self.read(paths::STATS)
    }

    /// Pin the calendar day used for daily challenges
    pub fn set_today(&mut self, day: NaiveDate) {
        self.today = Some(day);
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn read<T: DeserializeOwned + Default>(&self, path: &str) -> T {
        self.store.get(path).unwrap_or_default()
    }

    fn commit<const N: usize>(&self, changes: [(&str, Value); N]) -> GameResult<()> {
        self.store.update_many(changes, UpdateOptions::default())?;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.phase != SpinPhase::Idle
            || self.store.get::<bool>(paths::IS_SPINNING).unwrap_or(false)
            || self.free_spins().has_spins()
            || self.bonus().active
            || self.gamble_state().active
    }

    fn require_unlocked(&self, feature: &str) -> GameResult<()> {
        if self.progression().is_unlocked(&self.config.progression, feature) {
            return Ok(());
        }
        Err(GameError::Locked {
            feature: feature.to_string(),
            level: self.config.unlock_level(feature).unwrap_or(0),
        })
    }

    /// Queue a grid for the next spin instead of sampling the strips
    pub fn force_next_grid(&mut self, grid: Grid) -> GameResult<()> {
        let (reels, rows) = (self.config.grid.reels, self.config.grid.rows);
        if grid.reel_count() != reels || grid.row_count() != rows {
            return Err(GameError::GridShape {
                reels: grid.reel_count(),
                rows: grid.row_count(),
                expected_reels: reels,
                expected_rows: rows,
            });
        }
        self.forced.push_back(grid);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SPIN
    // ═══════════════════════════════════════════════════════════════════════

    fn spin_rejection(&self, free: bool) -> Option<SpinRejection> {
        if self.store.lifecycle() != Lifecycle::Initialized {
            return Some(SpinRejection::Disposed);
        }
        if self.phase != SpinPhase::Idle || self.store.get::<bool>(paths::IS_SPINNING).unwrap_or(false) {
            return Some(SpinRejection::AlreadySpinning);
        }
        if self.bonus().active {
            return Some(SpinRejection::BonusActive);
        }
        if self.gamble_state().active {
            return Some(SpinRejection::GambleActive);
        }
        if !free {
            let (credits, bet) = (self.credits(), self.current_bet());
            if credits < bet {
                return Some(SpinRejection::InsufficientCredits { credits, bet });
            }
        }
        None
    }

    /// Whether a spin may start now. A refusal is announced with a
    /// `Message` event; state is not touched.
    pub fn can_spin(&self) -> bool {
        match self.spin_rejection(self.free_spins().has_spins()) {
            None => true,
            Some(rejection) => {
                log::debug!("[Spin] refused: {:?}", rejection);
                self.events
                    .emit(GameEvent::message(MessageLevel::Warning, rejection.message()));
                false
            }
        }
    }

    /// Play one spin, plus any free spins it awards
    pub async fn spin(&mut self) -> SpinOutcome {
        let free = self.free_spins().has_spins();
        if let Some(rejection) = self.spin_rejection(free) {
            let text = rejection.message();
            log::debug!("[Spin] refused: {:?}", rejection);
            self.events
                .emit(GameEvent::message(MessageLevel::Warning, text.clone()));
            if let Err(e) = self.presenter.show_message(MessageLevel::Warning, &text).await {
                log::warn!("[Spin] presenter message failed: {}", e);
            }
            return SpinOutcome::Rejected(rejection);
        }

        let mut result = match self.spin_once(free).await {
            Ok(result) => result,
            Err(outcome) => return outcome,
        };
        if self.free_spins().active {
            result.free_spins = self.run_free_spins().await;
        }
        SpinOutcome::Completed(Box::new(result))
    }

    async fn spin_once(&mut self, free: bool) -> Result<SpinResult, SpinOutcome> {
        let spin_id = self.next_spin_id;
        self.next_spin_id += 1;
        let bet = self.current_bet();

        let checkpoint = self
            .store
            .create_checkpoint(&format!("spin-{spin_id}"), CHECKPOINT_PATHS)
            .map_err(|e| {
                log::error!("[Spin] checkpoint failed: {}", e);
                SpinOutcome::RolledBack {
                    reason: e.to_string(),
                }
            })?;

        match self.run_spin(spin_id, bet, free).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let refunded = if free { 0.0 } else { bet };
                self.rollback(spin_id, &checkpoint, refunded, &e);
                Err(SpinOutcome::RolledBack {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn rollback(&mut self, spin_id: u64, checkpoint: &Checkpoint, refunded: f64, error: &GameError) {
        log::error!("[Spin] spin {} failed while {}: {}", spin_id, self.phase, error);

        if let Err(e) = self.store.restore_checkpoint(checkpoint) {
            log::error!("[Spin] checkpoint restore failed: {}", e);
        }
        if let Err(e) = self.commit([(paths::IS_SPINNING, json!(false))]) {
            log::error!("[Spin] could not clear isSpinning: {}", e);
        }
        let cancelled = self.timers.cancel(SPIN_TIMER);
        if cancelled > 0 {
            log::debug!("[Spin] cancelled {} spin timers", cancelled);
        }
        self.events.emit(GameEvent::SpinFailed {
            spin_id,
            reason: error.to_string(),
            refunded,
        });
        let message = if refunded > 0.0 {
            SPIN_FAILED_MESSAGE
        } else {
            FREE_SPIN_FAILED_MESSAGE
        };
        if let Err(e) = self.commit([(paths::UI_MESSAGE, json!(message))]) {
            log::error!("[Spin] could not post failure message: {}", e);
        }
        self.phase = SpinPhase::Idle;
    }

    async fn run_spin(&mut self, spin_id: u64, bet: f64, free: bool) -> GameResult<SpinResult> {
        // ── Spinning ────────────────────────────────────────────────────────
        self.phase = SpinPhase::Spinning;
        let mut free_spins = self.free_spins();
        let multiplier = if free { free_spins.multiplier } else { 1.0 };

        let version = self.store.version();
        let credits = self.credits();
        if free {
            free_spins.consume();
        }
        self.store.update_many(
            [
                (paths::CREDITS, json!(if free { credits } else { credits - bet })),
                (paths::IS_SPINNING, json!(true)),
                (paths::LAST_WIN, json!(0.0)),
                (paths::FREE_SPINS, json!(free_spins)),
                (paths::GAMBLE, json!(GambleState::default())),
                (paths::UI_MESSAGE, json!("")),
            ],
            UpdateOptions::expecting(version),
        )?;
        self.events.emit(GameEvent::SpinStarted {
            spin_id,
            bet,
            free_spin: free,
        });

        let (reel_positions, grid) = self.next_grid()?;
        let anticipation = anticipation_reels(&grid, &self.symbols, &self.config.anticipation);
        self.commit([(paths::REEL_POSITIONS, json!(reel_positions))])?;
        self.events.emit(GameEvent::ReelsStopped {
            spin_id,
            positions: reel_positions.clone(),
            anticipation: anticipation.clone(),
        });
        self.presenter.spin_reels(&grid, &anticipation).await?;
        self.timers
            .delay(
                SPIN_TIMER,
                self.timing.spin_duration(grid.reel_count(), anticipation.len()),
            )
            .await?;

        // ── Evaluating ──────────────────────────────────────────────────────
        self.phase = SpinPhase::Evaluating;
        let win = self.evaluator.evaluate(&grid, bet);
        let bonus = self.evaluator.check_bonus_trigger(&grid);
        self.events.emit(GameEvent::WinEvaluated {
            spin_id,
            amount: win.total_win,
            lines: win.winning_lines.clone(),
            scatter_count: win.scatter_count,
        });

        let mut final_grid = grid.clone();
        let (cascade_win, cascade_steps) = if win.is_win() {
            let deps = CascadeDeps {
                store: &self.store,
                events: &self.events,
                presenter: &self.presenter,
                generator: &mut self.generator,
                evaluator: &self.evaluator,
                timers: &self.timers,
                timing: &self.timing,
            };
            let cascade_win = self
                .cascade
                .execute_cascade(deps, &mut final_grid, bet, &win.positions())
                .await;
            (cascade_win, self.cascade.count())
        } else {
            (0.0, 0)
        };
        let total_win = (win.total_win + cascade_win) * multiplier;

        if total_win > 0.0 {
            self.presenter.show_win(&win, total_win).await?;
            self.timers.delay(SPIN_TIMER, self.timing.win_reveal()).await?;
        }

        // ── FeatureHandling ─────────────────────────────────────────────────
        self.phase = SpinPhase::FeatureHandling;
        let awarded = if win.scatter_count >= self.config.scatter.min_count {
            spins_for(&self.config.free_spins, win.scatter_count)
        } else {
            None
        };
        if let Some(spins) = awarded {
            let retrigger = free_spins.award(spins, self.config.free_spins.multiplier);
            log::info!("[Spin] {} free spins awarded (retrigger: {})", spins, retrigger);
            self.events
                .emit(GameEvent::FreeSpinsAwarded { spins, retrigger });
            if !retrigger {
                self.presenter.free_spins_started(spins).await?;
            }
        }
        if free {
            free_spins.record_win(total_win);
        }
        self.commit([(paths::FREE_SPINS, json!(free_spins))])?;

        let bonus_triggered = !free && bonus.triggered;
        if bonus_triggered {
            let state = BonusState::start(&self.config.bonus, bet);
            log::info!("[Spin] bonus game triggered on lines {:?}", bonus.bonus_lines);
            self.commit([(paths::BONUS, json!(state))])?;
            self.events.emit(GameEvent::BonusTriggered {
                picks: self.config.bonus.picks,
                lines: bonus.bonus_lines.clone(),
            });
        }

        // ── Settling ────────────────────────────────────────────────────────
        self.phase = SpinPhase::Settling;
        let record = SpinRecord {
            bet,
            win: total_win,
            paid: !free,
            free_spins_triggered: awarded.is_some(),
            bonus_triggered,
            cascade_count: cascade_steps,
        };
        let report = self.settle(spin_id, &record, &free_spins)?;
        self.announce(&report);

        self.events.emit(GameEvent::SpinEnded { spin_id, total_win });
        self.phase = SpinPhase::Idle;

        Ok(SpinResult {
            spin_id,
            bet,
            free_spin: free,
            reel_positions,
            grid,
            final_grid,
            anticipation,
            win,
            bonus,
            cascade_steps,
            cascade_win,
            multiplier,
            total_win,
            free_spins_awarded: awarded.unwrap_or(0),
            free_spins: Vec::new(),
        })
    }

    fn next_grid(&mut self) -> GameResult<(Vec<usize>, Grid)> {
        if let Some(grid) = self.forced.pop_front() {
            log::debug!("[Spin] using forced grid");
            return Ok((vec![0; grid.reel_count()], grid));
        }

        let rows = self.config.grid.rows;
        let mut positions = Vec::with_capacity(self.strips.len());
        let mut columns = Vec::with_capacity(self.strips.len());
        for strip in &self.strips {
            let position = self.generator.random_position(strip.len());
            columns.push(SymbolGenerator::<R>::symbols_at_position(strip, position, rows));
            positions.push(position);
        }
        Ok((positions, Grid::new(columns)?))
    }

    /// Credit the win and fold the spin into stats and progression, in one commit
    fn settle(
        &mut self,
        spin_id: u64,
        record: &SpinRecord,
        free_spins: &FreeSpinsState,
    ) -> GameResult<ProgressReport> {
        let mut stats = self.stats();
        stats.record(record);
        let mut progression = self.progression();
        let report = progression.record_spin(&self.config.progression, &stats, record, self.today());

        let credits = self.credits() + record.win + report.credit_bonus();
        let spin_count = self.store.get::<u64>(paths::SPIN_COUNT).unwrap_or(0) + 1;
        let gamble = GambleState {
            available: record.paid
                && record.win > 0.0
                && !free_spins.active
                && !record.bonus_triggered
                && progression.is_unlocked(&self.config.progression, feature_keys::GAMBLE),
            ..GambleState::default()
        };
        let message = match report.level_ups.last() {
            Some(level_up) => json!(format!("Level up! Now level {}", level_up.level)),
            None => self.store.select(Some(paths::UI_MESSAGE)),
        };

        self.commit([
            (paths::CREDITS, json!(credits)),
            (paths::LAST_WIN, json!(record.win)),
            (paths::SPIN_COUNT, json!(spin_count)),
            (paths::IS_SPINNING, json!(false)),
            (paths::GAMBLE, json!(gamble)),
            (paths::STATS, json!(stats)),
            (paths::PROGRESSION, json!(progression)),
            (paths::UI_LAST_WIN_DISPLAY, json!(record.win)),
            (paths::UI_MESSAGE, message),
        ])?;
        log::debug!(
            "[Spin] spin {} settled: win {:.2}, credits {:.2}",
            spin_id,
            record.win,
            credits
        );

        if gamble.available {
            self.events
                .emit(GameEvent::GambleOffered { stake: record.win });
        }
        if let Err(e) = self.save() {
            log::warn!("[Spin] save failed: {}", e);
        }
        Ok(report)
    }

    fn announce(&self, report: &ProgressReport) {
        for level_up in &report.level_ups {
            log::info!("[Progression] level {} reached (+{:.0})", level_up.level, level_up.bonus);
            self.events.emit(GameEvent::LevelUp {
                level: level_up.level,
                bonus: level_up.bonus,
            });
        }
        for id in &report.achievements {
            log::info!("[Progression] achievement {}", id);
            self.events
                .emit(GameEvent::AchievementUnlocked { id: id.clone() });
        }
        for (id, reward) in &report.challenges {
            log::info!("[Progression] daily challenge {} complete (+{:.0})", id, reward);
            self.events.emit(GameEvent::ChallengeCompleted {
                id: id.clone(),
                reward: *reward,
            });
        }
    }

    /// Play awarded free spins until none remain
    async fn run_free_spins(&mut self) -> Vec<SpinResult> {
        let mut played = Vec::new();

        loop {
            let before = self.free_spins();
            if !before.has_spins() {
                break;
            }
            if let Err(e) = self
                .timers
                .delay(FREE_SPINS_TIMER, self.timing.free_spin_delay())
                .await
            {
                log::info!("[Spin] free spins paused: {}", e);
                return played;
            }
            if let Some(rejection) = self.spin_rejection(true) {
                log::warn!("[Spin] free spins paused: {:?}", rejection);
                return played;
            }

            let awarded = match self.spin_once(true).await {
                Ok(result) => {
                    let awarded = result.free_spins_awarded;
                    played.push(result);
                    awarded
                }
                Err(_) => 0,
            };

            let after = self.free_spins();
            if after.remaining >= before.remaining + awarded {
                log::warn!(
                    "[Spin] free spin made no progress ({} remaining), stopping",
                    after.remaining
                );
                return played;
            }
        }

        if let Err(e) = self.finish_free_spins().await {
            log::error!("[Spin] could not close free spins: {}", e);
        }
        played
    }

    async fn finish_free_spins(&mut self) -> GameResult<()> {
        let mut state = self.free_spins();
        if !state.active {
            return Ok(());
        }
        let total = state.finish();
        state.multiplier = self.config.free_spins.multiplier;
        self.commit([
            (paths::FREE_SPINS, json!(state)),
            (paths::UI_MESSAGE, json!(format!("Free spins won {total:.2}"))),
        ])?;
        log::info!("[Spin] free spins finished, won {:.2}", total);
        self.events.emit(GameEvent::FreeSpinsEnded { total_win: total });
        self.presenter.free_spins_ended(total).await?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // AUTOPLAY
    // ═══════════════════════════════════════════════════════════════════════

    /// Spin up to `count` times. Stops early on a refused or failed spin, or
    /// when `controls.autoplay.active` is cleared (see [`Self::stop_autoplay`]).
    pub async fn autoplay(&mut self, count: u32) -> GameResult<Vec<SpinOutcome>> {
        self.require_unlocked(feature_keys::AUTOPLAY)?;
        self.commit([(
            paths::AUTOPLAY,
            json!(AutoplayState {
                active: count > 0,
                remaining: count,
            }),
        )])?;

        let mut outcomes = Vec::new();
        loop {
            let state: AutoplayState = self.read(paths::AUTOPLAY);
            if !state.active || state.remaining == 0 {
                break;
            }

            let outcome = self.spin().await;
            let completed = outcome.is_completed();
            outcomes.push(outcome);

            let state: AutoplayState = self.read(paths::AUTOPLAY);
            let remaining = state.remaining.saturating_sub(1);
            self.commit([(
                paths::AUTOPLAY,
                json!(AutoplayState {
                    active: state.active && remaining > 0 && completed,
                    remaining,
                }),
            )])?;
            if !completed || remaining == 0 || !state.active {
                break;
            }
            if self
                .timers
                .delay(AUTOPLAY_TIMER, self.timing.autoplay_delay())
                .await
                .is_err()
            {
                break;
            }
        }

        self.commit([(paths::AUTOPLAY, json!(AutoplayState::default()))])?;
        log::info!("[Spin] autoplay finished after {} spins", outcomes.len());
        Ok(outcomes)
    }

    /// Clear the autoplay flag and cut the current autoplay pause short
    pub fn stop_autoplay(&self) -> GameResult<()> {
        let state: AutoplayState = self.read(paths::AUTOPLAY);
        self.commit([(
            paths::AUTOPLAY,
            json!(AutoplayState {
                active: false,
                ..state
            }),
        )])?;
        self.timers.cancel(AUTOPLAY_TIMER);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BETS & CONTROLS
    // ═══════════════════════════════════════════════════════════════════════

    /// Select a bet from the configured ladder
    pub fn set_bet_index(&mut self, index: usize) -> GameResult<f64> {
        if self.is_busy() {
            return Err(GameError::Busy("bet cannot change during a spin or feature"));
        }
        let options = &self.config.bets.options;
        let bet = *options.get(index).ok_or(GameError::InvalidBet {
            index,
            count: options.len(),
        })?;
        self.commit([
            (paths::BET_INDEX, json!(index)),
            (paths::CURRENT_BET, json!(bet)),
        ])?;
        Ok(bet)
    }

    fn bet_index(&self) -> usize {
        self.store
            .get(paths::BET_INDEX)
            .unwrap_or(self.config.bets.default_index)
    }

    pub fn increase_bet(&mut self) -> GameResult<f64> {
        let last = self.config.bets.options.len().saturating_sub(1);
        self.set_bet_index((self.bet_index() + 1).min(last))
    }

    pub fn decrease_bet(&mut self) -> GameResult<f64> {
        self.set_bet_index(self.bet_index().saturating_sub(1))
    }

    pub fn max_bet(&mut self) -> GameResult<f64> {
        self.require_unlocked(feature_keys::MAX_BET)?;
        self.set_bet_index(self.config.bets.options.len().saturating_sub(1))
    }

    /// Switch between turbo and the configured timing profile
    pub fn set_turbo(&mut self, on: bool) -> GameResult<()> {
        if on {
            self.require_unlocked(feature_keys::TURBO)?;
        }
        let profile = match (on, self.config.timing) {
            (true, _) => TimingProfile::Turbo,
            (false, TimingProfile::Turbo) => TimingProfile::Normal,
            (false, configured) => configured,
        };
        self.timing = TimingConfig::from_profile(profile);
        self.commit([(paths::TURBO, json!(on))])
    }

    pub fn set_cascade_enabled(&mut self, enabled: bool) -> GameResult<()> {
        self.commit([(paths::CASCADE_ENABLED, json!(enabled))])
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BONUS GAME
    // ═══════════════════════════════════════════════════════════════════════

    /// Reveal one slot of the active bonus board
    pub async fn pick_bonus(&mut self, slot: usize) -> GameResult<BonusPick> {
        let mut state = self.bonus();
        if !state.active {
            return Err(BonusError::NotActive.into());
        }
        let index = self.generator.pick_index(self.config.bonus.prize_multipliers.len());
        let prize = prize_for(&self.config.bonus, state.bet, index);
        let pick = state.pick(slot, prize)?;
        self.events.emit(GameEvent::BonusPicked {
            slot,
            prize: pick.prize,
        });

        if !pick.finished {
            self.commit([(paths::BONUS, json!(state))])?;
            return Ok(pick);
        }

        let credits = self.credits() + pick.total_win;
        let mut stats = self.stats();
        stats.total_won += pick.total_win;
        stats.biggest_win = stats.biggest_win.max(pick.total_win);
        let text = format!("Bonus won {:.2}", pick.total_win);
        self.commit([
            (paths::BONUS, json!(state)),
            (paths::CREDITS, json!(credits)),
            (paths::LAST_WIN, json!(pick.total_win)),
            (paths::UI_LAST_WIN_DISPLAY, json!(pick.total_win)),
            (paths::STATS, json!(stats)),
            (paths::UI_MESSAGE, json!(text.clone())),
        ])?;
        log::info!("[Spin] bonus game paid {:.2}", pick.total_win);
        self.events.emit(GameEvent::BonusEnded {
            total_win: pick.total_win,
        });
        if let Err(e) = self.presenter.show_message(MessageLevel::Success, &text).await {
            log::warn!("[Spin] presenter message failed: {}", e);
        }
        Ok(pick)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GAMBLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Stake the last win; it leaves the balance until collected
    pub fn start_gamble(&mut self) -> GameResult<f64> {
        self.require_unlocked(feature_keys::GAMBLE)?;
        let mut state = self.gamble_state();
        let stake: f64 = self.store.get(paths::LAST_WIN).unwrap_or(0.0);
        state.start(stake)?;

        let version = self.store.version();
        let credits = self.credits();
        self.store.update_many(
            [
                (paths::GAMBLE, json!(state)),
                (paths::CREDITS, json!((credits - stake).max(0.0))),
            ],
            UpdateOptions::expecting(version),
        )?;
        log::debug!("[Spin] gambling {:.2}", stake);
        Ok(stake)
    }

    /// Guess a color; reaching the round cap collects automatically
    pub fn gamble(&mut self, choice: GambleChoice) -> GameResult<GambleRound> {
        let mut state = self.gamble_state();
        let roll = self.generator.roll();
        let round = state.resolve(&self.config.gamble, choice, roll)?;
        self.events.emit(GameEvent::GambleResolved {
            won: round.won,
            pending: round.pending,
            round: round.round,
        });

        if round.won && round.finished {
            let amount = state.collect()?;
            self.credit_gamble(state, amount)?;
        } else {
            let last_win = if round.won { round.pending } else { 0.0 };
            self.commit([
                (paths::GAMBLE, json!(state)),
                (paths::LAST_WIN, json!(last_win)),
            ])?;
        }
        Ok(round)
    }

    /// Bank the pending gamble amount
    pub fn collect_gamble(&mut self) -> GameResult<f64> {
        let mut state = self.gamble_state();
        let amount = state.collect()?;
        self.credit_gamble(state, amount)?;
        Ok(amount)
    }

    fn credit_gamble(&self, state: GambleState, amount: f64) -> GameResult<()> {
        let credits = self.credits() + amount;
        self.commit([
            (paths::GAMBLE, json!(state)),
            (paths::CREDITS, json!(credits)),
            (paths::LAST_WIN, json!(amount)),
            (paths::UI_LAST_WIN_DISPLAY, json!(amount)),
        ])?;
        self.events.emit(GameEvent::GambleCollected { amount });
        Ok(())
    }

    /// Offer the last win for a gamble. The player's `decision` races the
    /// auto-collect countdown; a timeout or `Collect` withdraws the offer and
    /// leaves the win banked. Returns the first round when the player gambled.
    pub async fn offer_gamble<F>(&mut self, decision: F) -> GameResult<Option<GambleRound>>
    where
        F: Future<Output = GambleDecision>,
    {
        if !self.gamble_state().available {
            return Err(GambleError::NotAvailable.into());
        }
        let countdown = Duration::from_secs(self.config.gamble.countdown_secs);
        let timers = Arc::clone(&self.timers);

        let decided = tokio::select! {
            biased;
            decision = decision => Some(decision),
            _ = timers.delay(GAMBLE_OFFER_TIMER, countdown) => None,
        };

        match decided {
            Some(GambleDecision::Gamble(choice)) => {
                self.start_gamble()?;
                Ok(Some(self.gamble(choice)?))
            }
            Some(GambleDecision::Collect) | None => {
                if decided.is_none() {
                    log::debug!("[Spin] gamble offer timed out");
                }
                self.commit([(paths::GAMBLE, json!(GambleState::default()))])?;
                Ok(None)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════

    fn save_defaults(&self) -> SaveData {
        SaveData::fresh(&self.config, self.today())
    }

    /// Write the save document. A gamble in progress is saved as collected,
    /// since the document has no room for a pending stake.
    pub fn save(&self) -> GameResult<()> {
        let mut data = SaveData::capture(&self.store, &self.save_defaults(), Utc::now());
        let gamble = self.gamble_state();
        if gamble.active {
            data.credits += gamble.pending;
        }
        self.storage.save(&data.to_json()?)?;
        log::debug!("[Spin] saved ({} credits)", data.credits);
        Ok(())
    }

    /// Restore the saved player. Returns `false` when nothing was saved.
    pub fn load(&mut self) -> GameResult<bool> {
        if self.is_busy() {
            return Err(GameError::Busy("cannot load during a spin or feature"));
        }
        let Some(raw) = self.storage.load()? else {
            return Ok(false);
        };
        let data = SaveData::parse_lenient(&raw, self.save_defaults()).sanitize(&self.config);
        data.apply(&self.store)?;
        if data.settings.turbo {
            self.timing = TimingConfig::turbo();
        }
        log::info!(
            "[Spin] loaded save: {} credits, level {}",
            data.credits,
            data.progression.level
        );
        Ok(true)
    }

    /// Cancel timers, bank any gamble in progress, save and dispose the store
    pub fn shutdown(&mut self) {
        let cancelled = self.timers.cancel_all();
        if self.gamble_state().active {
            match self.collect_gamble() {
                Ok(amount) => log::info!("[Spin] gamble collected on shutdown: {:.2}", amount),
                Err(e) => log::error!("[Spin] could not collect gamble on shutdown: {}", e),
            }
        }
        if let Err(e) = self.save() {
            log::warn!("[Spin] save on shutdown failed: {}", e);
        }
        self.store.dispose();
        self.phase = SpinPhase::Idle;
        log::info!("[Spin] shut down ({} timers cancelled)", cancelled);
    }
}
