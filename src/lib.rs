//! slotmenu - per-user grid menus on top of a host's inventory-like surfaces.
//!
//! A [`Window`] describes a menu; opening it for a user creates a session
//! with its own [`Contents`] grid, filled by the window's
//! [`ContentProvider`] and shown through a registered [`DisplayAdapter`].
//! Host events go through an [`EventRouter`], which cancels interactions the
//! menu doesn't allow and runs cell click handlers.

pub mod config;
pub mod core;
pub mod error;
pub mod ui;
pub mod wm;

pub use crate::config::Config;
pub use crate::core::{Cell, ClickContext, Contents, IterOrder, Pagination, Pattern, SlotIterator, SlotPos, UserId};
pub use crate::error::{MenuError, Result};
pub use crate::ui::{DisplayAdapter, EventRouter, HostEvent, Surface, SurfaceId};
pub use crate::wm::{ContentProvider, Listener, MenuManager, MenuType, Window};
