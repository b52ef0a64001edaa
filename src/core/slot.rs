//! Slot positions inside a menu grid

use std::fmt;

/// A (row, column) coordinate inside a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlotPos {
    pub row: usize,
    pub column: usize,
}

impl SlotPos {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Position of a row-major flat index in a grid `columns` wide
    pub fn from_index(index: usize, columns: usize) -> Self {
        Self {
            row: index / columns.max(1),
            column: index % columns.max(1),
        }
    }

    /// Row-major flat index in a grid `columns` wide
    pub fn index(&self, columns: usize) -> usize {
        self.row * columns + self.column
    }

    /// Translate this position by `other`, or None past `usize::MAX`
    pub fn offset(&self, other: SlotPos) -> Option<SlotPos> {
        Some(SlotPos::new(
            self.row.checked_add(other.row)?,
            self.column.checked_add(other.column)?,
        ))
    }
}

impl From<(usize, usize)> for SlotPos {
    fn from((row, column): (usize, usize)) -> Self {
        Self::new(row, column)
    }
}

impl fmt::Display for SlotPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}
