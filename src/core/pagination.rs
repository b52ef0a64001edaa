//! Fixed-size pages over a flat sequence of cells

use crate::core::Cell;

/// Default number of items per page
const DEFAULT_PAGE_SIZE: usize = 5;

/// Pagination state of a session
#[derive(Debug, Clone)]
pub struct Pagination<T> {
    items: Vec<Cell<T>>,
    page_size: usize,
    page: usize,
}

impl<T> Default for Pagination<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }
}

impl<T: Clone> Pagination<T> {
    /// Cells of the current page, padded with `None` past the end of the sequence
    pub fn page_items(&self) -> Vec<Option<Cell<T>>> {
        let start = self.current() * self.page_size;
        (start..start + self.page_size)
            .map(|i| self.items.get(i).cloned())
            .collect()
    }
}

impl<T> Pagination<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the backing sequence, keeping the page clamped
    pub fn set_items(&mut self, items: Vec<Cell<T>>) -> &mut Self {
        self.items = items;
        self.clamp();
        self
    }

    /// Change the page size (zero is treated as one)
    pub fn set_items_per_page(&mut self, page_size: usize) -> &mut Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn items(&self) -> &[Cell<T>] {
        &self.items
    }

    pub fn items_per_page(&self) -> usize {
        self.page_size
    }

    /// Current page index
    pub fn current(&self) -> usize {
        self.page.min(self.last_page_index())
    }

    /// Record the page a session was opened on. The items usually arrive
    /// later from the provider, so clamping waits for `set_items`.
    pub(crate) fn seed(&mut self, page: usize) {
        self.page = page;
    }

    /// Jump to a page, clamped to the last page
    pub fn page(&mut self, page: usize) -> &mut Self {
        self.page = page;
        self.clamp();
        self
    }

    /// Number of pages, 0 for an empty sequence
    pub fn page_count(&self) -> usize {
        (self.items.len() + self.page_size - 1) / self.page_size
    }

    pub fn last_page_index(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn is_first(&self) -> bool {
        self.current() == 0
    }

    pub fn is_last(&self) -> bool {
        self.current() == self.last_page_index()
    }

    pub fn first(&mut self) -> &mut Self {
        self.page = 0;
        self
    }

    pub fn previous(&mut self) -> &mut Self {
        self.clamp();
        if !self.is_first() {
            self.page -= 1;
        }
        self
    }

    pub fn next(&mut self) -> &mut Self {
        self.clamp();
        if !self.is_last() {
            self.page += 1;
        }
        self
    }

    pub fn last(&mut self) -> &mut Self {
        self.page = self.last_page_index();
        self
    }

    fn clamp(&mut self) {
        self.page = self.page.min(self.last_page_index());
    }
}
