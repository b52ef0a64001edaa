//! Typed event listeners attached to a window
//!
//! Each listener is tagged with the kind of event it handles. A window keeps
//! them grouped by kind, in registration order, and fans events out to every
//! listener of the matching kind.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ui::{ClickEvent, CloseEvent, DragEvent, HostShutdown, OpenEvent, UserLeft};
use crate::wm::MenuManager;

/// Kind of lifecycle or interaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Drag,
    Open,
    Close,
    UserLeft,
    Shutdown,
}

/// A callback for one event kind
pub enum Listener<T> {
    Click(Rc<dyn Fn(&mut ClickEvent, &MenuManager<T>)>),
    Drag(Rc<dyn Fn(&mut DragEvent, &MenuManager<T>)>),
    Open(Rc<dyn Fn(&OpenEvent, &MenuManager<T>)>),
    Close(Rc<dyn Fn(&CloseEvent, &MenuManager<T>)>),
    UserLeft(Rc<dyn Fn(&UserLeft, &MenuManager<T>)>),
    Shutdown(Rc<dyn Fn(&HostShutdown, &MenuManager<T>)>),
}

impl<T> Listener<T> {
    pub fn on_click(f: impl Fn(&mut ClickEvent, &MenuManager<T>) + 'static) -> Self {
        Listener::Click(Rc::new(f))
    }

    pub fn on_drag(f: impl Fn(&mut DragEvent, &MenuManager<T>) + 'static) -> Self {
        Listener::Drag(Rc::new(f))
    }

    pub fn on_open(f: impl Fn(&OpenEvent, &MenuManager<T>) + 'static) -> Self {
        Listener::Open(Rc::new(f))
    }

    pub fn on_close(f: impl Fn(&CloseEvent, &MenuManager<T>) + 'static) -> Self {
        Listener::Close(Rc::new(f))
    }

    pub fn on_user_left(f: impl Fn(&UserLeft, &MenuManager<T>) + 'static) -> Self {
        Listener::UserLeft(Rc::new(f))
    }

    pub fn on_shutdown(f: impl Fn(&HostShutdown, &MenuManager<T>) + 'static) -> Self {
        Listener::Shutdown(Rc::new(f))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Listener::Click(_) => EventKind::Click,
            Listener::Drag(_) => EventKind::Drag,
            Listener::Open(_) => EventKind::Open,
            Listener::Close(_) => EventKind::Close,
            Listener::UserLeft(_) => EventKind::UserLeft,
            Listener::Shutdown(_) => EventKind::Shutdown,
        }
    }
}

/// Listeners of a window grouped by event kind
pub struct ListenerSet<T> {
    by_kind: HashMap<EventKind, Vec<Listener<T>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Listener<T>) {
        self.by_kind.entry(listener.kind()).or_default().push(listener);
    }

    /// Number of listeners for a kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    fn of(&self, kind: EventKind) -> &[Listener<T>] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fire_click(&self, event: &mut ClickEvent, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::Click) {
            if let Listener::Click(f) = listener {
                f(event, manager);
            }
        }
    }

    pub fn fire_drag(&self, event: &mut DragEvent, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::Drag) {
            if let Listener::Drag(f) = listener {
                f(event, manager);
            }
        }
    }

    pub fn fire_open(&self, event: &OpenEvent, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::Open) {
            if let Listener::Open(f) = listener {
                f(event, manager);
            }
        }
    }

    pub fn fire_close(&self, event: &CloseEvent, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::Close) {
            if let Listener::Close(f) = listener {
                f(event, manager);
            }
        }
    }

    pub fn fire_user_left(&self, event: &UserLeft, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::UserLeft) {
            if let Listener::UserLeft(f) = listener {
                f(event, manager);
            }
        }
    }

    pub fn fire_shutdown(&self, event: &HostShutdown, manager: &MenuManager<T>) {
        for listener in self.of(EventKind::Shutdown) {
            if let Listener::Shutdown(f) = listener {
                f(event, manager);
            }
        }
    }
}
