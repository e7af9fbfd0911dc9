//! Cascade (tumble) sequencer
//!
//! After a paying spin the winning cells are removed, survivors fall toward
//! the bottom row and the vacated top cells are refilled from the weighted
//! generator. The payline pass then runs again on the new grid; every paying
//! iteration bumps the cascade counter and the multiplier ladder.
//!
//! The loop ends on the first non-paying iteration or at the configured
//! ceiling. A failing presenter or store write aborts the chain but never
//! the spin: the partial total is returned and the multiplier hidden.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sf_core::{CoreError, CoreResult, Grid, Position, SymbolId};
use sf_stage::{EventBus, GameEvent};
use sf_state::{StateStore, UpdateOptions};

use crate::config::CascadeConfig;
use crate::error::GameResult;
use crate::game_state::paths;
use crate::paytable::LineEvaluator;
use crate::presenter::Presenter;
use crate::rng::SymbolGenerator;
use crate::timers::{CASCADE_TIMER, TimerRegistry};
use crate::timing::TimingConfig;

/// `features.cascade`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CascadeState {
    pub enabled: bool,
    pub active: bool,
    pub count: u32,
    pub multiplier: f64,
    pub total_win: f64,
}

impl Default for CascadeState {
    fn default() -> Self {
        Self {
            enabled: true,
            active: false,
            count: 0,
            multiplier: 1.0,
            total_win: 0.0,
        }
    }
}

/// Collaborators one cascade chain runs against
pub struct CascadeDeps<'a, P: Presenter, R: Rng> {
    pub store: &'a StateStore,
    pub events: &'a EventBus,
    pub presenter: &'a P,
    pub generator: &'a mut SymbolGenerator<R>,
    pub evaluator: &'a dyn LineEvaluator,
    pub timers: &'a TimerRegistry,
    pub timing: &'a TimingConfig,
}

/// Drives the remove → drop → refill → re-evaluate loop
#[derive(Debug, Clone)]
pub struct CascadeSequencer {
    config: CascadeConfig,
    count: u32,
    multiplier: f64,
    total: f64,
}

impl CascadeSequencer {
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            config,
            count: 0,
            multiplier: 1.0,
            total: 0.0,
        }
    }

    /// Paying iterations in the current (or last) chain
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Ladder entry for a cascade count, clamped to the last rung
    pub fn multiplier_for(&self, count: u32) -> f64 {
        let ladder = &self.config.multipliers;
        let index = (count as usize).min(ladder.len().saturating_sub(1));
        ladder.get(index).copied().unwrap_or(1.0)
    }

    fn reset(&mut self) {
        self.count = 0;
        self.multiplier = 1.0;
        self.total = 0.0;
    }

    /// Run a cascade chain starting from the base spin's winning cells.
    ///
    /// `grid` is updated in place. Returns the multiplied cascade winnings
    /// (base spin win excluded).
    pub async fn execute_cascade<P: Presenter, R: Rng>(
        &mut self,
        mut deps: CascadeDeps<'_, P, R>,
        grid: &mut Grid,
        bet: f64,
        initial: &[Position],
    ) -> f64 {
        self.reset();
        let enabled = deps.store.get::<bool>(paths::CASCADE_ENABLED).unwrap_or(false);
        if !enabled || initial.is_empty() {
            return 0.0;
        }

        match self.run(&mut deps, grid, bet, initial).await {
            Ok(()) => {
                let total = self.total;
                deps.events.emit(GameEvent::CascadeEnded {
                    steps: self.count,
                    total_win: total,
                });
                if self.count > 0 {
                    log::debug!("[Cascade] chain of {} paid {:.2}", self.count, total);
                    if let Err(e) = deps.presenter.hide_multiplier().await {
                        log::warn!("[Cascade] hide multiplier failed: {}", e);
                    }
                }
                self.publish(deps.store, false);
                total
            }
            Err(e) => {
                let partial = self.total;
                log::error!(
                    "[Cascade] aborted after {} steps, keeping {:.2}: {}",
                    self.count,
                    partial,
                    e
                );
                self.reset();
                if let Err(e) = deps.presenter.hide_multiplier().await {
                    log::warn!("[Cascade] hide multiplier failed: {}", e);
                }
                self.publish(deps.store, false);
                deps.events.emit(GameEvent::CascadeEnded {
                    steps: 0,
                    total_win: partial,
                });
                partial
            }
        }
    }

    async fn run<P: Presenter, R: Rng>(
        &mut self,
        deps: &mut CascadeDeps<'_, P, R>,
        grid: &mut Grid,
        bet: f64,
        initial: &[Position],
    ) -> GameResult<()> {
        let mut positions = initial.to_vec();
        let mut iterations = 0u32;

        loop {
            deps.presenter.remove_symbols(&positions).await?;
            let vacated = collapse(grid, &positions)?;
            deps.presenter.drop_symbols(&positions).await?;

            let mut fills = Vec::with_capacity(vacated.len());
            for pos in vacated {
                let symbol = deps
                    .generator
                    .weighted_symbol(pos.reel)
                    .ok_or(CoreError::OutOfBounds {
                        reel: pos.reel,
                        row: pos.row,
                        reels: deps.generator.reel_count(),
                        rows: grid.row_count(),
                    })?;
                grid.set(pos, symbol)?;
                fills.push((pos, symbol));
            }
            deps.presenter.fill_empty_spaces(&fills).await?;

            let win = deps.evaluator.evaluate_lines(grid, bet);
            iterations += 1;
            if !win.is_win() {
                return Ok(());
            }

            self.count += 1;
            self.multiplier = self.multiplier_for(self.count);
            let step_win = win.total_win * self.multiplier;
            self.total += step_win;

            deps.store.update_many(
                [
                    (paths::CASCADE_ACTIVE, json!(true)),
                    (paths::CASCADE_COUNT, json!(self.count)),
                    (paths::CASCADE_MULTIPLIER, json!(self.multiplier)),
                    (paths::CASCADE_TOTAL_WIN, json!(self.total)),
                    (paths::UI_SHOW_MULTIPLIER, json!(true)),
                ],
                UpdateOptions::default(),
            )?;
            deps.presenter
                .update_multiplier(self.multiplier, self.count)
                .await?;
            deps.events.emit(GameEvent::CascadeStep {
                step: self.count,
                multiplier: self.multiplier,
                win: step_win,
                positions: win.positions(),
            });
            deps.timers
                .delay(CASCADE_TIMER, deps.timing.cascade_step())
                .await?;

            if iterations >= self.config.max_iterations {
                log::warn!(
                    "[Cascade] hit the {} iteration ceiling, stopping with {:.2}",
                    self.config.max_iterations,
                    self.total
                );
                return Ok(());
            }
            positions = win.positions();
        }
    }

    fn publish(&self, store: &StateStore, active: bool) {
        let result = store.update_many(
            [
                (paths::CASCADE_ACTIVE, json!(active)),
                (paths::CASCADE_COUNT, json!(self.count)),
                (paths::CASCADE_MULTIPLIER, json!(self.multiplier)),
                (paths::CASCADE_TOTAL_WIN, json!(self.total)),
                (paths::UI_SHOW_MULTIPLIER, json!(active)),
            ],
            UpdateOptions::default(),
        );
        if let Err(e) = result {
            log::warn!("[Cascade] could not publish state: {}", e);
        }
    }
}

/// Remove `removed` cells and let each reel's survivors fall to the bottom.
///
/// Returns the vacated cells (the top of each affected reel), which still
/// hold the removed symbols until refilled.
pub fn collapse(grid: &mut Grid, removed: &[Position]) -> CoreResult<Vec<Position>> {
    let reels = grid.reel_count();
    let rows = grid.row_count();
    if let Some(bad) = removed.iter().find(|p| p.reel >= reels || p.row >= rows) {
        return Err(CoreError::OutOfBounds {
            reel: bad.reel,
            row: bad.row,
            reels,
            rows,
        });
    }

    let mut vacated = Vec::new();
    for reel in 0..reels {
        let gone: BTreeSet<usize> = removed
            .iter()
            .filter(|p| p.reel == reel)
            .map(|p| p.row)
            .collect();
        if gone.is_empty() {
            continue;
        }

        let column = grid.column(reel).to_vec();
        let mut next: Vec<SymbolId> = gone.iter().map(|&row| column[row]).collect();
        next.extend(
            column
                .iter()
                .enumerate()
                .filter(|(row, _)| !gone.contains(row))
                .map(|(_, s)| *s),
        );
        grid.replace_column(reel, next)?;
        vacated.extend((0..gone.len()).map(|row| Position::new(reel, row)));
    }
    Ok(vacated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, reference_symbols};
    use crate::error::{PresentError, PresentResult};
    use crate::paytable::WinInfo;
    use crate::presenter::NullPresenter;
    use crate::symbols::SymbolSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Every evaluation pays 10 on the top-left cell
    struct AlwaysWins;

    impl LineEvaluator for AlwaysWins {
        fn evaluate_lines(&self, _grid: &Grid, _bet: f64) -> WinInfo {
            WinInfo {
                total_win: 10.0,
                winning_positions: [Position::new(0, 0)].into_iter().collect(),
                winning_lines: vec![0],
                ..WinInfo::default()
            }
        }
    }

    /// Pays on the first `wins` evaluations, then stops paying
    struct PaysTimes {
        wins: u32,
        calls: AtomicU32,
    }

    impl LineEvaluator for PaysTimes {
        fn evaluate_lines(&self, grid: &Grid, bet: f64) -> WinInfo {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.wins {
                AlwaysWins.evaluate_lines(grid, bet)
            } else {
                WinInfo::default()
            }
        }
    }

    /// Fails the n-th fill
    struct FailingFill {
        fail_on: u32,
        fills: AtomicU32,
    }

    impl Presenter for FailingFill {
        async fn fill_empty_spaces(&self, _fills: &[(Position, SymbolId)]) -> PresentResult<()> {
            if self.fills.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(PresentError::new("renderer lost"));
            }
            Ok(())
        }
    }

    struct Harness {
        store: StateStore,
        events: EventBus,
        timers: TimerRegistry,
        timing: TimingConfig,
        generator: SymbolGenerator<ChaCha8Rng>,
        grid: Grid,
    }

    impl Harness {
        fn new(enabled: bool) -> Self {
            let symbols = SymbolSet::from_defs(&reference_symbols());
            Self {
                store: StateStore::with_initial(json!({
                    "features": { "cascade": { "enabled": enabled } },
                    "ui": {}
                })),
                events: EventBus::new(),
                timers: TimerRegistry::new(),
                timing: TimingConfig::studio(),
                generator: SymbolGenerator::new(&symbols, 5, ChaCha8Rng::seed_from_u64(3)).unwrap(),
                grid: Grid::filled(5, 3, SymbolId(0)),
            }
        }

        fn deps<'a, P: Presenter>(
            &'a mut self,
            presenter: &'a P,
            evaluator: &'a dyn LineEvaluator,
        ) -> (CascadeDeps<'a, P, ChaCha8Rng>, &'a mut Grid) {
            (
                CascadeDeps {
                    store: &self.store,
                    events: &self.events,
                    presenter,
                    generator: &mut self.generator,
                    evaluator,
                    timers: &self.timers,
                    timing: &self.timing,
                },
                &mut self.grid,
            )
        }
    }

    fn sequencer() -> CascadeSequencer {
        CascadeSequencer::new(GameConfig::default().cascade)
    }

    #[tokio::test]
    async fn test_always_winning_chain_stops_at_ceiling() {
        let mut harness = Harness::new(true);
        let mut seq = sequencer();
        let (deps, grid) = harness.deps(&NullPresenter, &AlwaysWins);

        let total = seq
            .execute_cascade(deps, grid, 1.0, &[Position::new(0, 0)])
            .await;

        // Ladder [1,2,3,5,8] read at counts 1..=10: 2+3+5+8×7
        assert_eq!(seq.count(), 10);
        assert_eq!(total, 660.0);
        assert_eq!(harness.store.get::<u32>(paths::CASCADE_COUNT), Some(10));
        assert_eq!(harness.store.get::<bool>(paths::CASCADE_ACTIVE), Some(false));
    }

    #[tokio::test]
    async fn test_chain_ends_on_first_miss() {
        let mut harness = Harness::new(true);
        let mut seq = sequencer();
        let evaluator = PaysTimes {
            wins: 2,
            calls: AtomicU32::new(0),
        };
        let (deps, grid) = harness.deps(&NullPresenter, &evaluator);

        let total = seq
            .execute_cascade(deps, grid, 1.0, &[Position::new(2, 1)])
            .await;

        assert_eq!(seq.count(), 2);
        assert_eq!(total, 10.0 * 2.0 + 10.0 * 3.0);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_or_empty_returns_zero() {
        let mut harness = Harness::new(false);
        let mut seq = sequencer();
        let (deps, grid) = harness.deps(&NullPresenter, &AlwaysWins);
        assert_eq!(seq.execute_cascade(deps, grid, 1.0, &[Position::new(0, 0)]).await, 0.0);

        let mut harness = Harness::new(true);
        let (deps, grid) = harness.deps(&NullPresenter, &AlwaysWins);
        assert_eq!(seq.execute_cascade(deps, grid, 1.0, &[]).await, 0.0);
        assert_eq!(harness.store.version(), 0);
    }

    #[tokio::test]
    async fn test_presenter_failure_keeps_partial_total() {
        let mut harness = Harness::new(true);
        let mut seq = sequencer();
        let presenter = FailingFill {
            fail_on: 3,
            fills: AtomicU32::new(0),
        };
        let (deps, grid) = harness.deps(&presenter, &AlwaysWins);

        let total = seq
            .execute_cascade(deps, grid, 1.0, &[Position::new(0, 0)])
            .await;

        assert_eq!(total, 20.0 + 30.0);
        assert_eq!(seq.count(), 0);
        assert_eq!(harness.store.get::<u32>(paths::CASCADE_COUNT), Some(0));
        assert_eq!(harness.store.get::<bool>(paths::UI_SHOW_MULTIPLIER), Some(false));
    }

    #[test]
    fn test_collapse_drops_survivors() {
        let s = SymbolId;
        let mut grid = Grid::new(vec![
            vec![s(1), s(2), s(3)],
            vec![s(4), s(5), s(6)],
        ])
        .unwrap();

        let vacated = collapse(&mut grid, &[Position::new(0, 2), Position::new(0, 0)]).unwrap();

        assert_eq!(vacated, vec![Position::new(0, 0), Position::new(0, 1)]);
        assert_eq!(grid.symbol(0, 2), s(2));
        assert_eq!(grid.column(1), &[s(4), s(5), s(6)]);
        assert!(collapse(&mut grid, &[Position::new(3, 0)]).is_err());
    }

    #[test]
    fn test_multiplier_ladder_clamps() {
        let seq = sequencer();
        assert_eq!(seq.multiplier_for(1), 2.0);
        assert_eq!(seq.multiplier_for(4), 8.0);
        assert_eq!(seq.multiplier_for(40), 8.0);
    }
}
