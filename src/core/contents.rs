//! Content grid of a menu session
//!
//! A `Contents` is the per-user mutable state of an open menu: a fixed
//! `rows × columns` matrix of optional cells, the session's pagination,
//! its named iterators and a property bag for passing ad hoc state between
//! a provider's `init` and `update` calls.
//!
//! Reads outside the grid return nothing, writes outside the grid are
//! ignored. Writes are mirrored onto the host surface only while the session
//! is the one the user is looking at.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::{Cell, IterOrder, Pagination, Pattern, SlotIterator, SlotPos, UserId};
use crate::error::{MenuError, Result};
use crate::ui::SurfaceLink;
use crate::wm::Window;

/// Per-session grid of cells
pub struct Contents<T> {
    user: UserId,
    window: Option<Rc<Window<T>>>,
    rows: usize,
    columns: usize,
    /// Row-major cells
    cells: Vec<Option<Cell<T>>>,
    pagination: Pagination<T>,
    iterators: HashMap<String, SlotIterator>,
    properties: HashMap<String, Box<dyn Any>>,
    /// Surface the user currently sees for this session (set on commit)
    link: SurfaceLink<T>,
}

impl<T> Contents<T> {
    /// Create a detached grid (not tied to any window or surface)
    pub fn new(user: UserId, rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(MenuError::InvalidDimensions { rows, columns });
        }
        Ok(Self::with_size(user, None, rows, columns, SurfaceLink::default()))
    }

    /// Create the grid of a window's session
    pub(crate) fn for_window(user: UserId, window: Rc<Window<T>>, link: SurfaceLink<T>) -> Self {
        let (rows, columns) = window.size();
        Self::with_size(user, Some(window), rows, columns, link)
    }

    fn with_size(user: UserId, window: Option<Rc<Window<T>>>, rows: usize, columns: usize, link: SurfaceLink<T>) -> Self {
        let mut cells = Vec::with_capacity(rows * columns);
        cells.resize_with(rows * columns, || None);
        Self {
            user,
            window,
            rows,
            columns,
            cells,
            pagination: Pagination::new(),
            iterators: HashMap::new(),
            properties: HashMap::new(),
            link,
        }
    }

    /// User owning this session
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Window this grid was created for
    pub fn window(&self) -> Option<&Rc<Window<T>>> {
        self.window.as_ref()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Whether writes are currently mirrored to a host surface
    pub fn is_visible(&self) -> bool {
        self.link.borrow().is_some()
    }

    fn index_of(&self, pos: SlotPos) -> Option<usize> {
        (pos.row < self.rows && pos.column < self.columns).then(|| pos.index(self.columns))
    }

    pub fn get(&self, pos: impl Into<SlotPos>) -> Option<&Cell<T>> {
        let index = self.index_of(pos.into())?;
        self.cells[index].as_ref()
    }

    /// Cell at a row-major flat index
    pub fn get_index(&self, index: usize) -> Option<&Cell<T>> {
        self.cells.get(index)?.as_ref()
    }

    /// Store or clear a cell
    pub fn set(&mut self, pos: impl Into<SlotPos>, cell: Option<Cell<T>>) -> &mut Self {
        if let Some(index) = self.index_of(pos.into()) {
            self.cells[index] = cell;
            self.sync_slot(index);
        }
        self
    }

    /// Store or clear a cell at a row-major flat index
    pub fn set_index(&mut self, index: usize, cell: Option<Cell<T>>) -> &mut Self {
        if index < self.cells.len() {
            self.cells[index] = cell;
            self.sync_slot(index);
        }
        self
    }

    pub fn clear(&mut self, pos: impl Into<SlotPos>) -> &mut Self {
        self.set(pos, None)
    }

    /// Place a cell in the first empty slot. Returns where it went.
    pub fn add(&mut self, cell: Cell<T>) -> Option<SlotPos> {
        let pos = self.first_empty()?;
        self.set(pos, Some(cell));
        Some(pos)
    }

    /// First empty slot in row-major order
    pub fn first_empty(&self) -> Option<SlotPos> {
        self.cells
            .iter()
            .position(Option::is_none)
            .map(|index| SlotPos::from_index(index, self.columns))
    }

    /// Occupied positions in row-major order
    pub fn slots(&self) -> Vec<SlotPos> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_some())
            .map(|(index, _)| SlotPos::from_index(index, self.columns))
            .collect()
    }

    /// Rows of the grid
    pub fn all(&self) -> impl Iterator<Item = &[Option<Cell<T>>]> {
        self.cells.chunks(self.columns)
    }

    /// Payloads by flat index, for adapters drawing the whole grid
    pub fn payloads(&self) -> impl Iterator<Item = (usize, Option<&T>)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| (index, cell.as_ref().and_then(|c| c.item.as_ref())))
    }

    /// Whether clicks on this slot go through uncancelled
    pub fn is_editable(&self, pos: impl Into<SlotPos>) -> bool {
        self.get(pos).map_or(false, |cell| cell.editable)
    }

    /// Toggle editability of a slot. An empty slot gets an empty editable cell.
    pub fn set_editable(&mut self, pos: impl Into<SlotPos>, editable: bool) -> &mut Self {
        let Some(index) = self.index_of(pos.into()) else {
            return self;
        };
        if let Some(cell) = &mut self.cells[index] {
            cell.editable = editable;
        } else if editable {
            self.cells[index] = Some(Cell::editable_empty());
        }
        self
    }

    pub fn pagination(&self) -> &Pagination<T> {
        &self.pagination
    }

    pub fn pagination_mut(&mut self) -> &mut Pagination<T> {
        &mut self.pagination
    }

    /// Create an iterator over this grid.
    ///
    /// With an id the iterator is also registered on the session. The
    /// returned value is a copy: use [`Contents::with_iterator`] to move the
    /// registered one.
    pub fn new_iterator(&mut self, id: Option<&str>, order: IterOrder, start: impl Into<SlotPos>) -> Result<SlotIterator> {
        let iterator = SlotIterator::new(self.rows, self.columns, order, start.into())?;
        if let Some(id) = id {
            self.iterators.insert(id.to_string(), iterator.clone());
        }
        Ok(iterator)
    }

    /// Registered iterator by id
    pub fn iterator(&self, id: &str) -> Option<&SlotIterator> {
        self.iterators.get(id)
    }

    /// Run `f` with a registered iterator and this grid, keeping the
    /// iterator's new position
    pub fn with_iterator<R, F>(&mut self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SlotIterator, &mut Self) -> R,
    {
        let mut iterator = self.iterators.remove(id)?;
        let result = f(&mut iterator, self);
        self.iterators.insert(id.to_string(), iterator);
        Some(result)
    }

    pub fn set_property<V: Any>(&mut self, name: &str, value: V) -> &mut Self {
        self.properties.insert(name.to_string(), Box::new(value));
        self
    }

    /// Property value, if set with this type
    pub fn property<V: Any>(&self, name: &str) -> Option<&V> {
        self.properties.get(name)?.downcast_ref()
    }

    pub fn property_or<V: Any + Clone>(&self, name: &str, default: V) -> V {
        self.property(name).cloned().unwrap_or(default)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.properties.remove(name)
    }

    fn sync_slot(&self, index: usize) {
        // Clone out so the link isn't borrowed while host code runs
        let surface = self.link.borrow().clone();
        if let Some(surface) = surface {
            let item = self.cells[index].as_ref().and_then(|c| c.item.as_ref());
            surface.set_slot(index, item);
        }
    }
}

impl<T: Clone> Contents<T> {
    /// Overwrite every slot
    pub fn fill(&mut self, cell: Cell<T>) -> &mut Self {
        for index in 0..self.cells.len() {
            self.set_index(index, Some(cell.clone()));
        }
        self
    }

    pub fn fill_row(&mut self, row: usize, cell: Cell<T>) -> &mut Self {
        if row < self.rows {
            for column in 0..self.columns {
                self.set((row, column), Some(cell.clone()));
            }
        }
        self
    }

    pub fn fill_column(&mut self, column: usize, cell: Cell<T>) -> &mut Self {
        if column < self.columns {
            for row in 0..self.rows {
                self.set((row, column), Some(cell.clone()));
            }
        }
        self
    }

    /// Frame the whole grid
    pub fn fill_borders(&mut self, cell: Cell<T>) -> &mut Self {
        let last = SlotPos::new(self.rows - 1, self.columns - 1);
        self.fill_rect(SlotPos::new(0, 0), last, cell)
    }

    /// Write the perimeter of the rectangle `from..=to`. The interior is untouched.
    pub fn fill_rect(&mut self, from: impl Into<SlotPos>, to: impl Into<SlotPos>, cell: Cell<T>) -> &mut Self {
        let (from, to) = (from.into(), to.into());
        let last = self.clamp(to);
        for row in from.row..=last.row {
            for column in from.column..=last.column {
                let edge = row == from.row || row == to.row || column == from.column || column == to.column;
                if edge {
                    self.set((row, column), Some(cell.clone()));
                }
            }
        }
        self
    }

    /// Stamp a pattern with its top-left corner at `anchor`.
    /// Template cells resolving to nothing leave the grid as it is.
    pub fn fill_pattern(&mut self, pattern: &Pattern<Cell<T>>, anchor: impl Into<SlotPos>) -> &mut Self {
        let anchor = anchor.into();
        for row in 0..pattern.row_count() {
            for column in 0..pattern.column_count() {
                let Some(pos) = anchor.offset(SlotPos::new(row, column)) else {
                    continue;
                };
                if let Ok(Some(cell)) = pattern.get_object(row as i64, column as i64) {
                    self.set(pos, Some(cell.clone()));
                }
            }
        }
        self
    }

    /// Tile a pattern over the region `from..=to`. Without wrap-around only
    /// the part of the region the template covers is written.
    pub fn fill_pattern_repeating(
        &mut self,
        pattern: &Pattern<Cell<T>>,
        from: impl Into<SlotPos>,
        to: impl Into<SlotPos>,
    ) -> &mut Self {
        let (from, to) = (from.into(), to.into());
        let last = self.clamp(to);
        for row in from.row..=last.row {
            for column in from.column..=last.column {
                let (r, c) = ((row - from.row) as i64, (column - from.column) as i64);
                if let Ok(Some(cell)) = pattern.get_object(r, c) {
                    self.set((row, column), Some(cell.clone()));
                }
            }
        }
        self
    }

    /// Last in-grid position of a region ending at `to`
    fn clamp(&self, to: SlotPos) -> SlotPos {
        SlotPos::new(to.row.min(self.rows - 1), to.column.min(self.columns - 1))
    }

    /// Place the current page's cells through `iterator` until it ends.
    /// Padding past the end of the sequence clears the slot.
    pub fn add_page_to_iterator(&mut self, iterator: &mut SlotIterator) -> &mut Self {
        for cell in self.pagination.page_items() {
            iterator.set(self, cell);
            if iterator.ended() {
                break;
            }
            iterator.next(self);
        }
        self
    }
}
