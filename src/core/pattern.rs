//! Character templates that resolve into positioned payloads
//!
//! A pattern is a rectangle of symbols. Each symbol is looked up in an
//! attached table, falling back to a default which may itself be "nothing":
//!
//! ```text
//! XXXXXXXXX
//! X.......X      'X' -> border cell
//! X.......X      '.' -> (unmapped, default)
//! XXXXXXXXX
//! ```
//!
//! With wrap-around enabled, lookups outside the rectangle tile it
//! infinitely in every direction.

use std::collections::HashMap;

use crate::core::SlotPos;
use crate::error::{MenuError, Result};

/// Immutable symbol template
#[derive(Debug, Clone)]
pub struct Pattern<V> {
    lines: Vec<Vec<char>>,
    columns: usize,
    mapping: HashMap<char, V>,
    default: Option<V>,
    wrap_around: bool,
}

impl<V> Pattern<V> {
    /// Create a pattern from equally wide lines
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        Self::build(lines, false)
    }

    /// Create a pattern whose lookups wrap around its edges
    pub fn wrapping<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        Self::build(lines, true)
    }

    fn build<S: AsRef<str>>(lines: &[S], wrap_around: bool) -> Result<Self> {
        let lines: Vec<Vec<char>> = lines.iter().map(|l| l.as_ref().chars().collect()).collect();
        let columns = match lines.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(MenuError::EmptyPattern),
        };

        if let Some((row, line)) = lines.iter().enumerate().find(|(_, l)| l.len() != columns) {
            return Err(MenuError::RaggedPattern {
                row,
                expected: columns,
                actual: line.len(),
            });
        }

        Ok(Self {
            lines,
            columns,
            mapping: HashMap::new(),
            default: None,
            wrap_around,
        })
    }

    /// Attach a payload to a symbol
    pub fn attach(mut self, key: char, value: V) -> Self {
        self.mapping.insert(key, value);
        self
    }

    /// Set the payload used for unmapped symbols
    pub fn with_default(mut self, value: V) -> Self {
        self.default = Some(value);
        self
    }

    pub fn set_default(&mut self, value: Option<V>) {
        self.default = value;
    }

    pub fn default_value(&self) -> Option<&V> {
        self.default.as_ref()
    }

    /// Resolve the payload at a template position
    pub fn get_object(&self, row: i64, column: i64) -> Result<Option<&V>> {
        let (row, column) = self.normalize(row, column)?;
        let key = self.lines[row][column];
        Ok(self.mapping.get(&key).or(self.default.as_ref()))
    }

    pub fn get_object_at(&self, pos: SlotPos) -> Result<Option<&V>> {
        self.get_object(pos.row as i64, pos.column as i64)
    }

    /// Resolve the payload at a row-major flat index
    pub fn get_object_index(&self, index: usize) -> Result<Option<&V>> {
        self.get_object_at(SlotPos::from_index(index, self.columns))
    }

    /// First position of a symbol in row-major order
    pub fn find_key(&self, key: char) -> Option<SlotPos> {
        self.positions().find(|pos| self.lines[pos.row][pos.column] == key)
    }

    /// All positions of a symbol in row-major order
    pub fn find_all_keys(&self, key: char) -> Vec<SlotPos> {
        self.positions()
            .filter(|pos| self.lines[pos.row][pos.column] == key)
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.lines.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn is_wrap_around(&self) -> bool {
        self.wrap_around
    }

    fn positions(&self) -> impl Iterator<Item = SlotPos> + '_ {
        (0..self.lines.len()).flat_map(move |row| (0..self.columns).map(move |column| SlotPos::new(row, column)))
    }

    fn normalize(&self, row: i64, column: i64) -> Result<(usize, usize)> {
        let rows = self.lines.len() as i64;
        let columns = self.columns as i64;

        if self.wrap_around {
            return Ok((row.rem_euclid(rows) as usize, column.rem_euclid(columns) as usize));
        }

        if row < 0 || row >= rows || column < 0 || column >= columns {
            return Err(MenuError::out_of_bounds(row, column, self.lines.len(), self.columns));
        }
        Ok((row as usize, column as usize))
    }
}
