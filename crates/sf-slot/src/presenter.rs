//! Presenter — the rendering collaborator
//!
//! The engine awaits each call and only cares that it eventually resolves.
//! Every method has a no-op default so a presenter implements what it
//! renders and nothing else.

use sf_core::{Grid, Position, SymbolId};
use sf_stage::MessageLevel;

use crate::error::PresentResult;
use crate::paytable::WinInfo;

/// Rendering hooks awaited by the spin pipeline
#[allow(async_fn_in_trait)]
pub trait Presenter {
    /// Reels start spinning toward `grid`; `anticipation` lists reels to dramatize
    async fn spin_reels(&self, _grid: &Grid, _anticipation: &[usize]) -> PresentResult<()> {
        Ok(())
    }

    async fn show_win(&self, _win: &WinInfo, _total: f64) -> PresentResult<()> {
        Ok(())
    }

    async fn remove_symbols(&self, _positions: &[Position]) -> PresentResult<()> {
        Ok(())
    }

    /// Survivors fall into the cells vacated below them
    async fn drop_symbols(&self, _removed: &[Position]) -> PresentResult<()> {
        Ok(())
    }

    /// New symbols for the vacated top cells
    async fn fill_empty_spaces(&self, _fills: &[(Position, SymbolId)]) -> PresentResult<()> {
        Ok(())
    }

    async fn update_multiplier(&self, _multiplier: f64, _cascade_count: u32) -> PresentResult<()> {
        Ok(())
    }

    async fn hide_multiplier(&self) -> PresentResult<()> {
        Ok(())
    }

    async fn show_message(&self, _level: MessageLevel, _text: &str) -> PresentResult<()> {
        Ok(())
    }

    async fn free_spins_started(&self, _spins: u32) -> PresentResult<()> {
        Ok(())
    }

    async fn free_spins_ended(&self, _total_win: f64) -> PresentResult<()> {
        Ok(())
    }
}

/// Headless presenter
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
