//! Runtime symbol set and reel strips

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sf_core::SymbolId;

use crate::config::{SymbolDef, SymbolKind};

/// A symbol as the engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub weight: u32,
    /// Allowed reels, `None` = every reel
    pub reels: Option<Vec<usize>>,
    pub payouts: BTreeMap<u32, f64>,
    pub tier: Option<String>,
}

impl Symbol {
    /// Whether the symbol may land on `reel`
    pub fn allowed_on(&self, reel: usize) -> bool {
        self.reels.as_ref().is_none_or(|r| r.contains(&reel))
    }

    /// Payout for an exact match count
    pub fn payout(&self, count: u32) -> Option<f64> {
        self.payouts.get(&count).copied()
    }

    /// Payout for the largest configured count not above `count`
    pub fn payout_at_most(&self, count: u32) -> Option<f64> {
        self.payouts.range(..=count).next_back().map(|(_, pay)| *pay)
    }
}

/// All symbols of a game, addressed by [`SymbolId`]
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolSet {
    /// Build from definitions; ids follow definition order
    pub fn from_defs(defs: &[SymbolDef]) -> Self {
        let symbols: Vec<Symbol> = defs
            .iter()
            .enumerate()
            .map(|(i, def)| Symbol {
                id: SymbolId(i as u16),
                name: def.name.clone(),
                kind: def.kind,
                weight: def.weight,
                reels: def.reels.clone(),
                payouts: def.payouts.clone(),
                tier: def.tier.clone(),
            })
            .collect();
        let by_name = symbols.iter().map(|s| (s.name.clone(), s.id)).collect();
        Self { symbols, by_name }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Look up by name
    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Kind of a symbol; unknown ids read as regular
    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.get(id).map(|s| s.kind).unwrap_or(SymbolKind::Regular)
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    /// Symbols allowed on `reel`
    pub fn allowed_on(&self, reel: usize) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |s| s.allowed_on(reel))
    }

    /// First symbol of a kind
    pub fn first_of(&self, kind: SymbolKind) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// A circular reel strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStrip {
    pub reel_index: usize,
    pub symbols: Vec<SymbolId>,
}

impl ReelStrip {
    pub fn new(reel_index: usize, symbols: Vec<SymbolId>) -> Self {
        Self { reel_index, symbols }
    }

    /// Symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> Option<SymbolId> {
        if self.symbols.is_empty() {
            return None;
        }
        Some(self.symbols[position % self.symbols.len()])
    }

    /// `rows` consecutive symbols starting at `position`, wrapping past the end
    pub fn window(&self, position: usize, rows: usize) -> Vec<SymbolId> {
        (0..rows)
            .filter_map(|offset| self.symbol_at(position + offset))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
