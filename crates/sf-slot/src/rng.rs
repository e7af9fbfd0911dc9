//! Weighted symbol generator
//!
//! Sampling is inverse-weighted: a symbol's chance on a reel is
//! proportional to `1 / weight`, so high-weight (premium) symbols are rare.
//! Each reel gets its own precomputed distribution over the symbols allowed
//! on it; draws themselves are never cached, so a seeded generator replays
//! the same sequence call for call.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use sf_core::SymbolId;

use crate::error::{ConfigError, ConfigResult};
use crate::symbols::{ReelStrip, SymbolSet};

struct ReelTable {
    symbols: Vec<SymbolId>,
    distribution: WeightedIndex<f64>,
}

/// Reel-aware weighted sampler owning its random source
pub struct SymbolGenerator<R: Rng> {
    rng: R,
    tables: Vec<ReelTable>,
}

impl<R: Rng> SymbolGenerator<R> {
    /// Build per-reel tables for `reels` reels
    pub fn new(symbols: &SymbolSet, reels: usize, rng: R) -> ConfigResult<Self> {
        let mut tables = Vec::with_capacity(reels);
        for reel in 0..reels {
            let allowed: Vec<_> = symbols.allowed_on(reel).filter(|s| s.weight > 0).collect();
            let weights: Vec<f64> = allowed.iter().map(|s| 1.0 / s.weight as f64).collect();
            let distribution = WeightedIndex::new(&weights).map_err(|e| ConfigError::Invalid {
                violations: vec![format!("reel {reel}: {e}")],
            })?;
            tables.push(ReelTable {
                symbols: allowed.iter().map(|s| s.id).collect(),
                distribution,
            });
        }
        Ok(Self { rng, tables })
    }

    /// One symbol for `reel`, never one the reel disallows.
    /// `None` for a reel the generator has no table for.
    pub fn weighted_symbol(&mut self, reel: usize) -> Option<SymbolId> {
        let table = self.tables.get(reel)?;
        table.symbols.get(table.distribution.sample(&mut self.rng)).copied()
    }

    /// A strip of `length` weighted draws; empty for an unknown reel
    pub fn reel_strip(&mut self, reel: usize, length: usize) -> ReelStrip {
        let symbols = (0..length).map_while(|_| self.weighted_symbol(reel)).collect();
        ReelStrip::new(reel, symbols)
    }

    /// Uniform position in `[0, strip_len)`; 0 for an empty strip
    pub fn random_position(&mut self, strip_len: usize) -> usize {
        if strip_len == 0 {
            return 0;
        }
        self.rng.random_range(0..strip_len)
    }

    /// Circular read of `rows` symbols from `position`
    pub fn symbols_at_position(strip: &ReelStrip, position: usize, rows: usize) -> Vec<SymbolId> {
        strip.window(position, rows)
    }

    /// Uniform index into a collection of `len` items
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.random_position(len)
    }

    /// Uniform roll in `[0, 1)`
    pub fn roll(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    pub fn reel_count(&self) -> usize {
        self.tables.len()
    }
}
