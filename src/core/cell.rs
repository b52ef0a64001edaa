//! Grid cells: a visual payload, an optional click handler and an editable flag

use std::fmt;
use std::rc::Rc;

use crate::core::{Contents, SlotPos, UserId};
use crate::ui::ClickEvent;
use crate::wm::MenuManager;

/// Everything a click handler gets to see and touch.
///
/// The handler may cancel or uncancel `event`, rewrite `contents` (including
/// replacing its own cell), and open or close menus through `manager`.
pub struct ClickContext<'a, T> {
    pub event: &'a mut ClickEvent,
    pub user: UserId,
    /// Payload of the clicked cell at dispatch time
    pub item: Option<T>,
    pub slot: SlotPos,
    pub contents: &'a mut Contents<T>,
    pub manager: &'a MenuManager<T>,
}

/// Click callback attached to a cell
pub type ClickHandler<T> = Rc<dyn Fn(&mut ClickContext<'_, T>) -> anyhow::Result<()>>;

/// A single grid cell
#[derive(Clone)]
pub struct Cell<T> {
    /// Visual payload, rendered by the display adapter
    pub item: Option<T>,
    /// Click handler (None = display only)
    pub handler: Option<ClickHandler<T>>,
    /// Editable cells are not cancelled by the router
    pub editable: bool,
}

impl<T> Cell<T> {
    /// Create a clickable cell
    pub fn new<F>(item: T, handler: F) -> Self
    where
        F: Fn(&mut ClickContext<'_, T>) -> anyhow::Result<()> + 'static,
    {
        Self {
            item: Some(item),
            handler: Some(Rc::new(handler)),
            editable: false,
        }
    }

    /// Create a display-only cell
    pub fn display(item: T) -> Self {
        Self {
            item: Some(item),
            handler: None,
            editable: false,
        }
    }

    /// Create an empty cell the user may freely interact with
    pub fn editable_empty() -> Self {
        Self {
            item: None,
            handler: None,
            editable: true,
        }
    }

    /// Mark this cell as editable (or not)
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn is_clickable(&self) -> bool {
        self.handler.is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("item", &self.item)
            .field("clickable", &self.handler.is_some())
            .field("editable", &self.editable)
            .finish()
    }
}
