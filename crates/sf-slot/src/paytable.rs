//! Paylines and win evaluation
//!
//! `PaylineEvaluator::evaluate` is a pure function of `(grid, bet)`:
//!
//! 1. **Payline pass**: each line is walked from reel 0. The first REGULAR
//!    symbol becomes the line's target; WILD matches the target (or keeps it
//!    open while none is set); anything else ends the run. SCATTER and BONUS
//!    always end it. A run that never establishes a target pays nothing.
//! 2. **Scatter pass**: SCATTERs count anywhere on the grid.
//!
//! Bonus detection is a separate call because only paid spins act on it.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_core::{Grid, Position, SymbolId};

use crate::config::{GameConfig, SymbolKind};
use crate::symbols::SymbolSet;

/// A payline: one row index per reel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payline {
    pub index: usize,
    pub rows: Vec<usize>,
}

impl Payline {
    pub fn new(index: usize, rows: Vec<usize>) -> Self {
        Self { index, rows }
    }

    /// Grid cells along the line, reel by reel
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(reel, &row)| Position::new(reel, row))
    }
}

/// A paying line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWin {
    pub line_index: usize,
    /// Target symbol that paid
    pub symbol: SymbolId,
    pub symbol_name: String,
    pub match_count: u32,
    pub amount: f64,
    /// Cells of the run, wilds included
    pub positions: Vec<Position>,
}

/// Result of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinInfo {
    pub total_win: f64,
    /// Every paying cell, once
    pub winning_positions: BTreeSet<Position>,
    /// Paying payline indices, in payline order
    pub winning_lines: Vec<usize>,
    pub line_wins: Vec<LineWin>,
    pub has_scatter_win: bool,
    /// SCATTERs on the grid (reported even below the paying minimum)
    pub scatter_count: u32,
    pub scatter_win: f64,
}

impl WinInfo {
    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    pub fn positions(&self) -> Vec<Position> {
        self.winning_positions.iter().copied().collect()
    }
}

/// Result of the bonus check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTrigger {
    pub triggered: bool,
    /// Paylines carrying at least one BONUS
    pub bonus_lines: Vec<usize>,
    /// Distinct BONUS cells lying on paylines
    pub positions: BTreeSet<Position>,
}

impl BonusTrigger {
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// The payline pass, separated out so cascades can run it alone
pub trait LineEvaluator {
    fn evaluate_lines(&self, grid: &Grid, bet: f64) -> WinInfo;
}

/// Payline + scatter evaluator for a configured game
#[derive(Debug, Clone)]
pub struct PaylineEvaluator {
    symbols: Arc<SymbolSet>,
    paylines: Vec<Payline>,
    payout_divisor: f64,
    scatter_min: u32,
    bonus_min: u32,
}

impl PaylineEvaluator {
    pub fn new(symbols: Arc<SymbolSet>, config: &GameConfig) -> Self {
        let paylines = config
            .paylines
            .iter()
            .enumerate()
            .map(|(i, rows)| Payline::new(i, rows.clone()))
            .collect();
        Self {
            symbols,
            paylines,
            payout_divisor: config.payout_divisor,
            scatter_min: config.scatter.min_count,
            bonus_min: config.bonus.min_symbols,
        }
    }

    pub fn paylines(&self) -> &[Payline] {
        &self.paylines
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    /// Payline pass + scatter pass
    pub fn evaluate(&self, grid: &Grid, bet: f64) -> WinInfo {
        let mut info = self.evaluate_lines(grid, bet);
        self.evaluate_scatter(grid, bet, &mut info);
        info
    }

    fn evaluate_line(&self, grid: &Grid, payline: &Payline, bet: f64) -> Option<LineWin> {
        debug_assert_eq!(payline.rows.len(), grid.reel_count());

        let mut target: Option<SymbolId> = None;
        let mut positions = Vec::with_capacity(payline.rows.len());

        for pos in payline.positions() {
            let Some(symbol) = grid.get(pos) else {
                break;
            };
            match self.symbols.kind(symbol) {
                SymbolKind::Wild => {}
                SymbolKind::Regular => match target {
                    None => target = Some(symbol),
                    Some(t) if t == symbol => {}
                    Some(_) => break,
                },
                SymbolKind::Scatter | SymbolKind::Bonus => break,
            }
            positions.push(pos);
        }

        // wilds alone never complete a line
        let target = target?;
        let match_count = positions.len() as u32;
        let sym = self.symbols.get(target)?;
        let pay = sym.payout(match_count)?;
        let amount = pay * bet / self.payout_divisor;
        if amount <= 0.0 {
            return None;
        }

        Some(LineWin {
            line_index: payline.index,
            symbol: target,
            symbol_name: sym.name.clone(),
            match_count,
            amount,
            positions,
        })
    }

    /// Scatters pay anywhere on the grid once `scatter_min` are showing.
    /// A count with its own table entry pays exactly that entry; a count
    /// beyond the table pays the largest configured count below it.
    fn evaluate_scatter(&self, grid: &Grid, bet: f64, info: &mut WinInfo) {
        let scatters: Vec<Position> = grid
            .positions()
            .filter(|p| {
                grid.get(*p)
                    .is_some_and(|s| self.symbols.kind(s) == SymbolKind::Scatter)
            })
            .collect();
        info.scatter_count = scatters.len() as u32;

        if info.scatter_count < self.scatter_min {
            return;
        }
        let Some(pay) = self
            .symbols
            .first_of(SymbolKind::Scatter)
            .and_then(|s| s.payout_at_most(info.scatter_count))
        else {
            return;
        };

        let amount = pay * bet / self.payout_divisor;
        info.has_scatter_win = true;
        info.scatter_win = amount;
        info.total_win += amount;
        info.winning_positions.extend(scatters);
    }

    /// BONUS symbols counted on payline paths only
    pub fn check_bonus_trigger(&self, grid: &Grid) -> BonusTrigger {
        let mut trigger = BonusTrigger::default();
        for payline in &self.paylines {
            let mut on_line = false;
            for pos in payline.positions() {
                if grid
                    .get(pos)
                    .is_some_and(|s| self.symbols.kind(s) == SymbolKind::Bonus)
                {
                    trigger.positions.insert(pos);
                    on_line = true;
                }
            }
            if on_line {
                trigger.bonus_lines.push(payline.index);
            }
        }
        trigger.triggered = trigger.positions.len() as u32 >= self.bonus_min;
        trigger
    }
}

impl LineEvaluator for PaylineEvaluator {
    fn evaluate_lines(&self, grid: &Grid, bet: f64) -> WinInfo {
        let mut info = WinInfo::default();
        for payline in &self.paylines {
            if let Some(win) = self.evaluate_line(grid, payline, bet) {
                info.total_win += win.amount;
                info.winning_positions.extend(win.positions.iter().copied());
                info.winning_lines.push(win.line_index);
                info.line_wins.push(win);
            }
        }
        info
    }
}
