//! Reel anticipation
//!
//! Presentation-only pre-check run before the reels stop: once the reels
//! revealed so far hold enough SCATTERs, every later reel is flagged so the
//! presenter can slow it down. Never affects the outcome.

use sf_core::Grid;

use crate::config::{AnticipationConfig, SymbolKind};
use crate::symbols::SymbolSet;

/// Reels to dramatize, left to right
pub fn anticipation_reels(grid: &Grid, symbols: &SymbolSet, config: &AnticipationConfig) -> Vec<usize> {
    if !config.enabled {
        return Vec::new();
    }

    let mut seen = 0u32;
    let mut reels = Vec::new();
    for reel in 0..grid.reel_count() {
        if seen >= config.trigger_count {
            reels.push(reel);
        }
        seen += grid
            .column(reel)
            .iter()
            .filter(|&&s| symbols.kind(s) == SymbolKind::Scatter)
            .count() as u32;
    }
    reels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reference_symbols;

    fn grid_with_scatters(on_reels: &[usize]) -> (Grid, SymbolSet) {
        let symbols = SymbolSet::from_defs(&reference_symbols());
        let cherry = symbols.id_of("CHERRY").unwrap();
        let scatter = symbols.id_of("SCATTER").unwrap();
        let mut columns = vec![vec![cherry; 3]; 5];
        for &reel in on_reels {
            columns[reel][1] = scatter;
        }
        (Grid::new(columns).unwrap(), symbols)
    }

    #[test]
    fn test_two_scatters_flag_later_reels() {
        let (grid, symbols) = grid_with_scatters(&[0, 2]);
        let reels = anticipation_reels(&grid, &symbols, &AnticipationConfig::default());
        assert_eq!(reels, vec![3, 4]);
    }

    #[test]
    fn test_single_scatter_flags_nothing() {
        let (grid, symbols) = grid_with_scatters(&[4]);
        assert!(anticipation_reels(&grid, &symbols, &AnticipationConfig::default()).is_empty());
    }

    #[test]
    fn test_disabled() {
        let (grid, symbols) = grid_with_scatters(&[0, 1, 2]);
        let config = AnticipationConfig {
            enabled: false,
            ..AnticipationConfig::default()
        };
        assert!(anticipation_reels(&grid, &symbols, &config).is_empty());
    }
}
