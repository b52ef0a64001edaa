//! Grid model of a menu session.
//!
//! This module contains the data a menu is made of, independent of how it
//! is opened or displayed:
//!
//! - **slot**: `SlotPos` (row, column) coordinates
//! - **cell**: `Cell` payload + click handler + editable flag
//! - **pattern**: symbol templates resolving to payloads
//! - **iterator**: row-major / column-major cursors
//! - **pagination**: fixed-size pages over a flat sequence
//! - **contents**: the per-session grid tying the above together
//!
//! # Architecture
//!
//! ```text
//! Contents
//! ├── cells       (rows × columns of Option<Cell>)
//! ├── Pagination  (backing sequence + current page)
//! ├── iterators   (named SlotIterator cursors)
//! └── properties  (untyped key/value bag)
//! ```

use std::fmt;

pub mod slot;
pub mod cell;
pub mod pattern;
pub mod iterator;
pub mod pagination;
pub mod contents;

pub use slot::SlotPos;
pub use cell::{Cell, ClickContext, ClickHandler};
pub use pattern::Pattern;
pub use iterator::{IterOrder, SlotIterator};
pub use pagination::Pagination;
pub use contents::Contents;

/// Identifier of a host user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}
