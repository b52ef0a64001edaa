//! Bounds-aware cursor over a menu grid
//!
//! An iterator only stores its cursor; reads and writes go through the grid
//! passed to each call. Stepping stops at the grid's final cell
//! `(rows - 1, columns - 1)` no matter where the iterator started, so an
//! iterator anchored mid-grid walks fewer than `rows * columns` slots.

use std::collections::HashSet;

use crate::core::{Cell, Contents, SlotPos};
use crate::error::{MenuError, Result};

/// Traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterOrder {
    /// Across columns first, then down a row
    RowMajor,
    /// Down rows first, then across a column
    ColumnMajor,
}

/// Cursor over a `rows × columns` grid
#[derive(Debug, Clone)]
pub struct SlotIterator {
    order: IterOrder,
    rows: usize,
    columns: usize,
    row: usize,
    column: usize,
    started: bool,
    blacklist: HashSet<SlotPos>,
    allow_override: bool,
}

impl SlotIterator {
    /// Create an iterator for a grid of the given size, starting at `start`
    pub fn new(rows: usize, columns: usize, order: IterOrder, start: SlotPos) -> Result<Self> {
        if start.row >= rows || start.column >= columns {
            return Err(MenuError::out_of_bounds(start.row as i64, start.column as i64, rows, columns));
        }

        Ok(Self {
            order,
            rows,
            columns,
            row: start.row,
            column: start.column,
            started: false,
            blacklist: HashSet::new(),
            allow_override: true,
        })
    }

    /// Cell at the cursor
    pub fn get<'a, T>(&self, contents: &'a Contents<T>) -> Option<&'a Cell<T>> {
        contents.get(self.pos())
    }

    /// Write a cell at the cursor (skipped when the slot is not placeable)
    pub fn set<T>(&self, contents: &mut Contents<T>, cell: Option<Cell<T>>) -> &Self {
        if self.can_place(contents) {
            contents.set(self.pos(), cell);
        }
        self
    }

    /// Advance one slot, skipping slots that can't be placed on
    pub fn next<T>(&mut self, contents: &Contents<T>) -> &mut Self {
        self.started = true;
        while !self.ended() {
            self.step_forward();
            if self.can_place(contents) {
                break;
            }
        }
        self
    }

    /// Step back one slot, clamped at the origin
    pub fn previous<T>(&mut self, contents: &Contents<T>) -> &mut Self {
        self.started = true;
        while !self.at_origin() {
            self.step_back();
            if self.can_place(contents) {
                break;
            }
        }
        self
    }

    /// Exclude a position from placement while stepping
    pub fn blacklist(&mut self, pos: impl Into<SlotPos>) -> &mut Self {
        self.blacklist.insert(pos.into());
        self
    }

    /// When disabled, occupied slots are skipped and never overwritten
    pub fn allow_override(&mut self, allow: bool) -> &mut Self {
        self.allow_override = allow;
        self
    }

    pub fn first(&mut self) -> &mut Self {
        self.row = 0;
        self.column = 0;
        self
    }

    pub fn last(&mut self) -> &mut Self {
        self.row = self.rows - 1;
        self.column = self.columns - 1;
        self
    }

    /// True exactly at the grid's final cell
    pub fn ended(&self) -> bool {
        self.row == self.rows - 1 && self.column == self.columns - 1
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn pos(&self) -> SlotPos {
        SlotPos::new(self.row, self.column)
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn order(&self) -> IterOrder {
        self.order
    }

    /// Whether the cursor may write into its current slot
    pub fn can_place<T>(&self, contents: &Contents<T>) -> bool {
        !self.blacklist.contains(&self.pos()) && (self.allow_override || contents.get(self.pos()).is_none())
    }

    fn at_origin(&self) -> bool {
        self.row == 0 && self.column == 0
    }

    fn step_forward(&mut self) {
        match self.order {
            IterOrder::RowMajor => {
                self.column += 1;
                if self.column == self.columns {
                    self.column = 0;
                    self.row += 1;
                }
            }
            IterOrder::ColumnMajor => {
                self.row += 1;
                if self.row == self.rows {
                    self.row = 0;
                    self.column += 1;
                }
            }
        }
    }

    fn step_back(&mut self) {
        match self.order {
            IterOrder::RowMajor => {
                if self.column == 0 {
                    self.column = self.columns - 1;
                    self.row -= 1;
                } else {
                    self.column -= 1;
                }
            }
            IterOrder::ColumnMajor => {
                if self.row == 0 {
                    self.row = self.rows - 1;
                    self.column -= 1;
                } else {
                    self.row -= 1;
                }
            }
        }
    }
}
