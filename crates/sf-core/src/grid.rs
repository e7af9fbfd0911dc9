//! Symbol identifiers, grid coordinates and the reel grid

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Opaque symbol identifier (index into the configured symbol set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u16);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell on the grid, addressed reel-first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub reel: usize,
    pub row: usize,
}

impl Position {
    #[inline]
    pub const fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }
}

impl From<(usize, usize)> for Position {
    fn from((reel, row): (usize, usize)) -> Self {
        Self { reel, row }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.reel, self.row)
    }
}

/// Visible reel window: `columns[reel][row]`, row 0 is the top row.
///
/// Every reel has the same number of rows; the constructor enforces it so
/// evaluation code can index without bounds juggling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    columns: Vec<Vec<SymbolId>>,
}

impl Grid {
    /// Build a grid from reel columns
    pub fn new(columns: Vec<Vec<SymbolId>>) -> CoreResult<Self> {
        let first = columns.first().ok_or(CoreError::EmptyGrid)?;
        let expected = first.len();
        if expected == 0 {
            return Err(CoreError::EmptyGrid);
        }
        for (reel, column) in columns.iter().enumerate() {
            if column.len() != expected {
                return Err(CoreError::RaggedReel {
                    reel,
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Grid filled with one symbol
    pub fn filled(reels: usize, rows: usize, symbol: SymbolId) -> Self {
        Self {
            columns: vec![vec![symbol; rows.max(1)]; reels.max(1)],
        }
    }

    #[inline]
    pub fn reel_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Symbol at a position, `None` when outside the grid
    pub fn get(&self, pos: Position) -> Option<SymbolId> {
        self.columns.get(pos.reel)?.get(pos.row).copied()
    }

    /// Symbol at `(reel, row)`.
    ///
    /// Panics when out of bounds; callers address cells from the grid's own
    /// dimensions.
    #[inline]
    pub fn symbol(&self, reel: usize, row: usize) -> SymbolId {
        self.columns[reel][row]
    }

    /// Overwrite one cell
    pub fn set(&mut self, pos: Position, symbol: SymbolId) -> CoreResult<()> {
        let reels = self.reel_count();
        let rows = self.row_count();
        let cell = self
            .columns
            .get_mut(pos.reel)
            .and_then(|c| c.get_mut(pos.row))
            .ok_or(CoreError::OutOfBounds {
                reel: pos.reel,
                row: pos.row,
                reels,
                rows,
            })?;
        *cell = symbol;
        Ok(())
    }

    /// One reel, top to bottom
    pub fn column(&self, reel: usize) -> &[SymbolId] {
        &self.columns[reel]
    }

    /// Replace a reel wholesale (same height required)
    pub fn replace_column(&mut self, reel: usize, column: Vec<SymbolId>) -> CoreResult<()> {
        let expected = self.row_count();
        if column.len() != expected {
            return Err(CoreError::RaggedReel {
                reel,
                expected,
                actual: column.len(),
            });
        }
        let reels = self.reel_count();
        let slot = self.columns.get_mut(reel).ok_or(CoreError::OutOfBounds {
            reel,
            row: 0,
            reels,
            rows: expected,
        })?;
        *slot = column;
        Ok(())
    }

    pub fn columns(&self) -> &[Vec<SymbolId>] {
        &self.columns
    }

    /// All positions, reel-major
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let rows = self.row_count();
        (0..self.reel_count()).flat_map(move |reel| (0..rows).map(move |row| Position { reel, row }))
    }

    /// Positions holding `symbol`
    pub fn positions_of(&self, symbol: SymbolId) -> Vec<Position> {
        self.positions()
            .filter(|&p| self.symbol(p.reel, p.row) == symbol)
            .collect()
    }

    /// Raw ids, mostly for logging and event payloads
    pub fn to_ids(&self) -> Vec<Vec<u16>> {
        self.columns
            .iter()
            .map(|c| c.iter().map(|s| s.0).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(id: u16) -> SymbolId {
        SymbolId(id)
    }

    #[test]
    fn test_grid_rejects_ragged_reels() {
        let err = Grid::new(vec![vec![s(1), s(2)], vec![s(1)]]).unwrap_err();
        assert_eq!(
            err,
            CoreError::RaggedReel {
                reel: 1,
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(Grid::new(Vec::new()).unwrap_err(), CoreError::EmptyGrid);
    }

    #[test]
    fn test_grid_access() {
        let mut grid = Grid::new(vec![vec![s(1), s(2), s(3)], vec![s(4), s(5), s(6)]]).unwrap();
        assert_eq!(grid.reel_count(), 2);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.symbol(1, 2), s(6));
        assert_eq!(grid.get(Position::new(2, 0)), None);

        grid.set(Position::new(0, 0), s(9)).unwrap();
        assert_eq!(grid.symbol(0, 0), s(9));
        assert!(grid.set(Position::new(0, 3), s(9)).is_err());
    }

    #[test]
    fn test_positions_of() {
        let grid = Grid::new(vec![vec![s(1), s(7)], vec![s(7), s(1)]]).unwrap();
        assert_eq!(
            grid.positions_of(s(7)),
            vec![Position::new(0, 1), Position::new(1, 0)]
        );
        assert_eq!(grid.positions().count(), 4);
    }
}
