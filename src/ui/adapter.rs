//! Display adapter seam between the engine and the host's screen

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::{Contents, UserId};
use crate::wm::{MenuType, Window};

/// Identifier of a host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// A grid shown on the host for one user
pub trait Surface<T> {
    fn id(&self) -> SurfaceId;

    /// Mirror a single slot write
    fn set_slot(&self, index: usize, item: Option<&T>);

    /// Redraw everything from the host's own state
    fn resync(&self);

    /// Take the surface off the screen
    fn close(&self);
}

/// Renders menus of the types it supports
pub trait DisplayAdapter<T> {
    fn supports(&self, kind: MenuType) -> bool;

    /// Put `contents` on screen for `user`
    fn open(&self, window: &Window<T>, user: UserId, contents: &Contents<T>) -> anyhow::Result<Rc<dyn Surface<T>>>;

    /// Size used when a window doesn't set one
    fn default_dimensions(&self, kind: MenuType) -> (usize, usize) {
        kind.default_dimensions()
    }
}

/// Shared slot holding the surface a session is visible on
pub type SurfaceLink<T> = Rc<RefCell<Option<Rc<dyn Surface<T>>>>>;
