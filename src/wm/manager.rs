//! Menu Manager - per-user session registry and lifecycle
//!
//! Every user has at most one session. Opening a menu runs through these
//! steps, re-checking after each callback that the session is still the
//! user's current one:
//!
//! ```text
//! open(user, window, page)
//!   1. close notification for the committed session, entry cleared
//!   2. fresh Contents, pagination seeded to `page`
//!   3. entry registered in the Opening phase
//!   4. provider.init        -> replaced meanwhile? stop
//!   5. adapter lookup       -> none: failure handler + NoAdapter
//!   6. adapter.open         -> error: failure handler + rollback
//!   7. commit: phase Open, writes start syncing to the surface
//! ```
//!
//! No registry borrow is held while user code runs, so providers, handlers
//! and listeners may freely call back into the manager.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::{Contents, UserId};
use crate::error::{MenuError, Result};
use crate::ui::{CloseEvent, DisplayAdapter, HostShutdown, OpenEvent, Surface, SurfaceId, SurfaceLink, UserLeft};
use crate::wm::{MenuType, Window};

/// Called when opening a menu fails
pub type FailureHandler<T> = Rc<dyn Fn(&Window<T>, UserId, &MenuError)>;

/// Generation number of a session. Every open gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Registered, provider init or adapter open still running
    Opening,
    /// On screen
    Open,
}

/// Snapshot of a user's session.
///
/// Holding one doesn't keep the session alive: check
/// [`MenuManager::is_current`] after anything that may have replaced it.
pub struct Session<T> {
    pub id: SessionId,
    pub user: UserId,
    pub phase: Phase,
    pub window: Rc<Window<T>>,
    pub contents: Rc<RefCell<Contents<T>>>,
    /// Surface the user sees. While opening this is the previous session's.
    pub surface: Option<Rc<dyn Surface<T>>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            user: self.user,
            phase: self.phase,
            window: self.window.clone(),
            contents: self.contents.clone(),
            surface: self.surface.clone(),
        }
    }
}

impl<T> Session<T> {
    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.surface.as_ref().map(|s| s.id())
    }
}

struct Entry<T> {
    session: Session<T>,
    link: SurfaceLink<T>,
}

struct Registry<T> {
    entries: HashMap<UserId, Entry<T>>,
    next_id: u64,
    /// Non-closeable sessions closed by the host, shown again on the next tick
    pending_reopen: Vec<(UserId, SessionId)>,
}

pub(crate) struct Inner<T> {
    registry: RefCell<Registry<T>>,
    adapters: RefCell<Vec<Rc<dyn DisplayAdapter<T>>>>,
    failure_handler: RefCell<Option<FailureHandler<T>>>,
    config: Config,
}

/// Non-owning handle windows keep to their manager
pub(crate) type WeakManager<T> = Weak<Inner<T>>;

/// Session registry. Cloning gives another handle to the same registry.
pub struct MenuManager<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for MenuManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for MenuManager<T> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<T: 'static> MenuManager<T> {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(Registry {
                    entries: HashMap::new(),
                    next_id: 1,
                    pending_reopen: Vec::new(),
                }),
                adapters: RefCell::new(Vec::new()),
                failure_handler: RefCell::new(None),
                config,
            }),
        }
    }

    pub(crate) fn upgrade(weak: &WeakManager<T>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn downgrade(&self) -> WeakManager<T> {
        Rc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Register a display adapter. Later registrations take precedence.
    pub fn register_adapter(&self, adapter: Rc<dyn DisplayAdapter<T>>) {
        self.inner.adapters.borrow_mut().push(adapter);
    }

    /// Replace the default failure handler (which logs the error)
    pub fn set_failure_handler(&self, handler: impl Fn(&Window<T>, UserId, &MenuError) + 'static) {
        *self.inner.failure_handler.borrow_mut() = Some(Rc::new(handler));
    }

    fn find_adapter(&self, kind: MenuType) -> Option<Rc<dyn DisplayAdapter<T>>> {
        self.inner.adapters.borrow().iter().rev().find(|a| a.supports(kind)).cloned()
    }

    /// Size used for windows of `kind` built without one
    pub fn default_dimensions(&self, kind: MenuType) -> Result<(usize, usize)> {
        if let Some(dims) = self.inner.config.dimensions_for(kind) {
            return Ok((dims.rows, dims.columns));
        }
        self.find_adapter(kind)
            .map(|adapter| adapter.default_dimensions(kind))
            .ok_or(MenuError::NoAdapter(kind))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Session of `user` in any phase
    pub fn session(&self, user: UserId) -> Option<Session<T>> {
        self.inner.registry.borrow().entries.get(&user).map(|e| e.session.clone())
    }

    /// Session of `user` if it's on screen
    pub fn open_session(&self, user: UserId) -> Option<Session<T>> {
        self.session(user).filter(|s| s.phase == Phase::Open)
    }

    /// Whether `id` is still the session registered for `user`
    pub fn is_current(&self, user: UserId, id: SessionId) -> bool {
        self.inner.registry.borrow().entries.get(&user).map(|e| e.session.id) == Some(id)
    }

    /// Window the user is looking at
    pub fn window(&self, user: UserId) -> Option<Rc<Window<T>>> {
        self.open_session(user).map(|s| s.window)
    }

    /// Grid of the user's session, including one still being opened
    pub fn contents(&self, user: UserId) -> Option<Rc<RefCell<Contents<T>>>> {
        self.session(user).map(|s| s.contents)
    }

    /// Surface the user is looking at
    pub fn surface(&self, user: UserId) -> Option<Rc<dyn Surface<T>>> {
        self.open_session(user).and_then(|s| s.surface)
    }

    /// Users with a menu on screen, sorted
    pub fn active_users(&self) -> Vec<UserId> {
        let registry = self.inner.registry.borrow();
        let mut users: Vec<UserId> = registry
            .entries
            .values()
            .filter(|e| e.session.phase == Phase::Open)
            .map(|e| e.session.user)
            .collect();
        users.sort();
        users
    }

    /// Users looking at `window`, sorted
    pub fn opened_users(&self, window: &Window<T>) -> Vec<UserId> {
        let registry = self.inner.registry.borrow();
        let mut users: Vec<UserId> = registry
            .entries
            .values()
            .filter(|e| e.session.phase == Phase::Open && std::ptr::eq(Rc::as_ptr(&e.session.window), window))
            .map(|e| e.session.user)
            .collect();
        users.sort();
        users
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open `window` for `user` with pagination seeded to `page`.
    ///
    /// Returns the new surface, or `None` when the open was superseded by a
    /// reentrant open/close or failed and was rolled back. Failures go
    /// to the failure handler; a missing adapter is also returned as an error.
    pub fn open(&self, user: UserId, window: &Rc<Window<T>>, page: usize) -> Result<Option<SurfaceId>> {
        let stale_surface = self.retire(user);

        let (id, contents, link) = {
            let mut registry = self.inner.registry.borrow_mut();
            let id = SessionId(registry.next_id);
            registry.next_id += 1;

            let link = SurfaceLink::default();
            let mut contents = Contents::for_window(user, window.clone(), link.clone());
            contents.pagination_mut().seed(page);
            let contents = Rc::new(RefCell::new(contents));

            let session = Session {
                id,
                user,
                phase: Phase::Opening,
                window: window.clone(),
                contents: contents.clone(),
                surface: stale_surface,
            };
            registry.entries.insert(user, Entry { session, link: link.clone() });
            (id, contents, link)
        };
        debug!("Opening '{}' for {} as {}", window.id(), user, id);

        let init = {
            let mut contents = contents.borrow_mut();
            window.provider().init(&mut contents, self)
        };
        if let Err(source) = init {
            let err = MenuError::Init { id: window.id().to_string(), source };
            self.fail(user, id, window, &err);
            return Ok(None);
        }

        if !self.is_current(user, id) {
            debug!("{} for {} was superseded during init", id, user);
            return Ok(None);
        }

        let Some(adapter) = self.find_adapter(window.kind()) else {
            self.fail(user, id, window, &MenuError::NoAdapter(window.kind()));
            return Err(MenuError::NoAdapter(window.kind()));
        };

        let opened = {
            let contents = contents.borrow();
            adapter.open(window, user, &contents)
        };
        let surface = match opened {
            Ok(surface) => surface,
            Err(source) => {
                let err = MenuError::Display { id: window.id().to_string(), source };
                self.fail(user, id, window, &err);
                return Ok(None);
            }
        };

        {
            let mut registry = self.inner.registry.borrow_mut();
            match registry.entries.get_mut(&user) {
                Some(entry) if entry.session.id == id => {
                    entry.session.phase = Phase::Open;
                    entry.session.surface = Some(surface.clone());
                }
                _ => {
                    debug!("{} for {} was superseded while displaying", id, user);
                    return Ok(None);
                }
            }
        }
        let surface_id = surface.id();
        *link.borrow_mut() = Some(surface);

        info!("Opened '{}' for {} on {}", window.id(), user, surface_id);
        Ok(Some(surface_id))
    }

    /// Open the parent of the user's current window on its first page
    pub fn open_parent(&self, user: UserId) -> Result<Option<SurfaceId>> {
        match self.window(user).and_then(|w| w.parent().cloned()) {
            Some(parent) => self.open(user, &parent, 0),
            None => Ok(None),
        }
    }

    /// Close notification for the committed session of `user`, then clear
    /// its entry. Returns the surface still on screen, if any.
    fn retire(&self, user: UserId) -> Option<Rc<dyn Surface<T>>> {
        if let Some(previous) = self.open_session(user) {
            let event = CloseEvent {
                user,
                surface: previous.surface_id(),
            };
            previous.window.listeners().fire_close(&event, self);
        }

        let entry = self.inner.registry.borrow_mut().entries.remove(&user)?;
        entry.link.borrow_mut().take();
        entry.session.surface
    }

    /// Report an open failure and roll the session back if it's still current
    fn fail(&self, user: UserId, id: SessionId, window: &Window<T>, err: &MenuError) {
        let removed = {
            let mut registry = self.inner.registry.borrow_mut();
            let current = registry.entries.get(&user).map(|e| e.session.id) == Some(id);
            if current {
                registry.entries.remove(&user)
            } else {
                None
            }
        };
        if let Some(entry) = removed {
            entry.link.borrow_mut().take();
            if self.inner.config.close_on_open_failure {
                if let Some(surface) = entry.session.surface {
                    surface.close();
                }
            }
        }

        let handler = self.inner.failure_handler.borrow().clone();
        match handler {
            Some(handler) => handler(window, user, err),
            None => error!("Failed to open '{}' for {}: {}", window.id(), user, err),
        }
    }

    /// Close the user's menu. Does nothing if there isn't one.
    pub fn close(&self, user: UserId) {
        let Some(session) = self.session(user) else {
            return;
        };
        let event = CloseEvent {
            user,
            surface: session.surface_id(),
        };
        session.window.listeners().fire_close(&event, self);

        let removed = self.remove_if_current(user, session.id);
        if let Some(entry) = removed {
            if let Some(surface) = entry.session.surface {
                surface.close();
            }
            info!("Closed '{}' for {}", session.window.id(), user);
        }
    }

    fn remove_if_current(&self, user: UserId, id: SessionId) -> Option<Entry<T>> {
        let entry = {
            let mut registry = self.inner.registry.borrow_mut();
            let current = registry.entries.get(&user).map(|e| e.session.id) == Some(id);
            if !current {
                return None;
            }
            registry.entries.remove(&user)
        }?;
        entry.link.borrow_mut().take();
        Some(entry)
    }

    // ------------------------------------------------------------------
    // Host notifications
    // ------------------------------------------------------------------

    /// The host showed `event.surface`. Only honored for the surface of the
    /// committed session. Returns whether it matched.
    pub(crate) fn host_opened(&self, event: &OpenEvent) -> bool {
        let session = self
            .open_session(event.user)
            .filter(|s| s.surface_id() == Some(event.surface));
        let Some(session) = session else {
            return false;
        };
        session.window.listeners().fire_open(event, self);
        true
    }

    /// The host closed a surface. Only honored for the surface of the
    /// committed session; non-closeable menus are queued to reopen.
    pub(crate) fn host_closed(&self, event: &CloseEvent) -> bool {
        let Some(session) = self.open_session(event.user) else {
            return false;
        };
        if event.surface.is_none() || session.surface_id() != event.surface {
            debug!("Ignoring close of stale surface for {}", event.user);
            return false;
        }

        session.window.listeners().fire_close(event, self);
        if !self.is_current(event.user, session.id) {
            return true;
        }

        if session.window.is_closeable() {
            self.remove_if_current(event.user, session.id);
            info!("'{}' closed by host for {}", session.window.id(), event.user);
        } else {
            debug!("'{}' is not closeable, reopening for {}", session.window.id(), event.user);
            self.inner.registry.borrow_mut().pending_reopen.push((event.user, session.id));
        }
        true
    }

    /// The user disconnected. Their session is dropped without closing the surface.
    pub(crate) fn user_left(&self, event: &UserLeft) -> bool {
        let Some(session) = self.session(event.user) else {
            return false;
        };
        session.window.listeners().fire_user_left(event, self);
        self.remove_if_current(event.user, session.id);
        self.inner.registry.borrow_mut().pending_reopen.retain(|(user, _)| *user != event.user);
        info!("{} left, dropped '{}'", event.user, session.window.id());
        true
    }

    /// Notify every session and close it
    pub fn shutdown(&self) {
        let sessions: Vec<Session<T>> = {
            let registry = self.inner.registry.borrow();
            registry.entries.values().map(|e| e.session.clone()).collect()
        };
        for session in &sessions {
            session.window.listeners().fire_shutdown(&HostShutdown, self);
            self.close(session.user);
        }

        let mut registry = self.inner.registry.borrow_mut();
        for entry in registry.entries.values() {
            entry.link.borrow_mut().take();
        }
        registry.entries.clear();
        registry.pending_reopen.clear();
        info!("Menu manager shut down ({} sessions)", sessions.len());
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// One refresh tick: reopen queued non-closeable menus, then run
    /// `update` on every open session.
    pub fn tick(&self) {
        self.reopen_pending();

        let sessions: Vec<Session<T>> = {
            let registry = self.inner.registry.borrow();
            registry
                .entries
                .values()
                .filter(|e| e.session.phase == Phase::Open)
                .map(|e| e.session.clone())
                .collect()
        };

        for session in sessions {
            // An earlier update may have closed or replaced it
            if !self.is_current(session.user, session.id) {
                continue;
            }
            let Ok(mut contents) = session.contents.try_borrow_mut() else {
                warn!("Contents of {} busy, skipping update", session.user);
                continue;
            };
            if let Err(e) = session.window.provider().update(&mut contents, self) {
                warn!("Update of '{}' for {} failed: {:#}", session.window.id(), session.user, e);
            }
        }
    }

    fn reopen_pending(&self) {
        let pending = std::mem::take(&mut self.inner.registry.borrow_mut().pending_reopen);
        for (user, id) in pending {
            let Some(session) = self.open_session(user).filter(|s| s.id == id) else {
                continue;
            };
            let Some(adapter) = self.find_adapter(session.window.kind()) else {
                self.fail(user, id, &session.window, &MenuError::NoAdapter(session.window.kind()));
                continue;
            };

            let opened = match session.contents.try_borrow() {
                Ok(contents) => adapter.open(&session.window, user, &contents),
                Err(_) => {
                    self.inner.registry.borrow_mut().pending_reopen.push((user, id));
                    continue;
                }
            };
            match opened {
                Ok(surface) => self.rebind(user, id, surface),
                Err(source) => {
                    let err = MenuError::Display {
                        id: session.window.id().to_string(),
                        source,
                    };
                    self.fail(user, id, &session.window, &err);
                }
            }
        }
    }

    /// Point a committed session at a new surface
    fn rebind(&self, user: UserId, id: SessionId, surface: Rc<dyn Surface<T>>) {
        let link = {
            let mut registry = self.inner.registry.borrow_mut();
            match registry.entries.get_mut(&user) {
                Some(entry) if entry.session.id == id => {
                    entry.session.surface = Some(surface.clone());
                    entry.link.clone()
                }
                _ => return,
            }
        };
        debug!("Reopened {} for {} on {}", id, user, surface.id());
        *link.borrow_mut() = Some(surface);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as Counter;

    use anyhow::bail;

    use super::*;
    use crate::core::Cell;
    use crate::wm::testing::{adapter_for, setup, Updating};
    use crate::wm::{Listener, WindowBuilder};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn window(manager: &MenuManager<i32>, id: &str) -> WindowBuilder<i32> {
        Window::builder().id(id).manager(manager).size(2, 3)
    }

    fn recorder() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_open_commits_and_syncs() {
        let (manager, adapter) = setup();
        let menu = window(&manager, "main")
            .init_with(|contents, _| {
                contents.set((0, 0), Some(Cell::display(1)));
                Ok(())
            })
            .build()
            .unwrap();

        let surface = manager.open(ALICE, &menu, 0).unwrap();
        assert_eq!(surface, Some(SurfaceId(1)));
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &menu)));
        assert_eq!(manager.active_users(), vec![ALICE]);
        assert_eq!(menu.opened_users(), vec![ALICE]);

        // Init writes happen before the surface exists
        assert!(adapter.surface(0).writes.borrow().is_empty());

        let contents = manager.contents(ALICE).unwrap();
        assert!(contents.borrow().is_visible());
        contents.borrow_mut().set((0, 1), Some(Cell::display(2)));
        assert_eq!(*adapter.surface(0).writes.borrow(), vec![(1, Some(2))]);
    }

    #[test]
    fn test_open_seeds_page() {
        let (manager, _adapter) = setup();
        let menu = window(&manager, "paged")
            .init_with(|contents, _| {
                contents
                    .pagination_mut()
                    .set_items_per_page(6)
                    .set_items((0..20).map(Cell::display).collect());
                Ok(())
            })
            .build()
            .unwrap();

        menu.open_page(ALICE, 2).unwrap();
        let contents = manager.contents(ALICE).unwrap();
        assert_eq!(contents.borrow().pagination().current(), 2);

        menu.open_page(ALICE, 99).unwrap();
        let contents = manager.contents(ALICE).unwrap();
        assert_eq!(contents.borrow().pagination().current(), 3);
    }

    #[test]
    fn test_replace_notifies_once_before_new_init() {
        let (manager, adapter) = setup();
        let log = recorder();

        let l = log.clone();
        let first = window(&manager, "first")
            .listener(Listener::on_close(move |_, _| l.borrow_mut().push("close first".into())))
            .build()
            .unwrap();
        let l = log.clone();
        let second = window(&manager, "second")
            .init_with(move |_, _| {
                l.borrow_mut().push("init second".into());
                Ok(())
            })
            .build()
            .unwrap();

        manager.open(ALICE, &first, 0).unwrap();
        let old_contents = manager.contents(ALICE).unwrap();
        manager.open(ALICE, &second, 0).unwrap();

        assert_eq!(*log.borrow(), vec!["close first", "init second"]);
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &second)));

        // The replaced grid no longer reaches the screen
        old_contents.borrow_mut().set((0, 0), Some(Cell::display(5)));
        assert!(!old_contents.borrow().is_visible());
        assert!(adapter.surface(0).writes.borrow().is_empty());
        // Replacement doesn't close the host view, the new surface takes over
        assert!(!adapter.surface(0).closed.get());
    }

    #[test]
    fn test_init_that_closes_renders_nothing() {
        let (manager, adapter) = setup();
        let menu = window(&manager, "gate")
            .init_with(|contents, manager| {
                manager.close(contents.user());
                Ok(())
            })
            .build()
            .unwrap();

        assert_eq!(manager.open(ALICE, &menu, 0).unwrap(), None);
        assert_eq!(adapter.open_count(), 0);
        assert!(manager.session(ALICE).is_none());
    }

    #[test]
    fn test_init_that_replaces_renders_only_the_replacement() {
        let (manager, adapter) = setup();
        let target = window(&manager, "target").build().unwrap();
        let redirect = {
            let target = target.clone();
            window(&manager, "redirect")
                .init_with(move |contents, manager| {
                    manager.open(contents.user(), &target, 0)?;
                    Ok(())
                })
                .build()
                .unwrap()
        };

        assert_eq!(manager.open(ALICE, &redirect, 0).unwrap(), None);
        assert_eq!(*adapter.opened.borrow(), vec![(ALICE, "target".to_string())]);
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &target)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (manager, adapter) = setup();
        let closes = Rc::new(Counter::new(0));
        let c = closes.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_close(move |_, _| c.set(c.get() + 1)))
            .build()
            .unwrap();

        manager.open(ALICE, &menu, 0).unwrap();
        manager.close(ALICE);
        manager.close(ALICE);
        menu.close(ALICE).unwrap();

        assert_eq!(closes.get(), 1);
        assert!(adapter.surface(0).closed.get());
        assert!(manager.session(ALICE).is_none());
        assert!(manager.active_users().is_empty());
    }

    #[test]
    fn test_window_close_only_closes_itself() {
        let (manager, _adapter) = setup();
        let shown = window(&manager, "shown").build().unwrap();
        let other = window(&manager, "other").build().unwrap();

        shown.open(ALICE).unwrap();
        other.close(ALICE).unwrap();
        assert!(manager.window(ALICE).is_some());
        shown.close(ALICE).unwrap();
        assert!(manager.window(ALICE).is_none());
    }

    #[test]
    fn test_init_failure_rolls_back() {
        let (manager, adapter) = setup();
        let failures = recorder();
        let f = failures.clone();
        manager.set_failure_handler(move |window, user, err| {
            f.borrow_mut().push(format!("{} {} {}", window.id(), user, err));
        });

        let good = window(&manager, "good").build().unwrap();
        let broken = window(&manager, "broken").init_with(|_, _| bail!("no stock")).build().unwrap();

        manager.open(ALICE, &good, 0).unwrap();
        assert_eq!(manager.open(ALICE, &broken, 0).unwrap(), None);

        assert_eq!(
            *failures.borrow(),
            vec!["broken user#1 Failed to initialize menu 'broken': no stock".to_string()]
        );
        assert!(manager.session(ALICE).is_none());
        assert!(adapter.surface(0).closed.get());
        assert_eq!(adapter.open_count(), 1);
    }

    #[test]
    fn test_display_failure_rolls_back() {
        let (manager, adapter) = setup();
        let failures = Rc::new(Counter::new(0));
        let f = failures.clone();
        manager.set_failure_handler(move |_, _, err| {
            assert!(matches!(err, MenuError::Display { .. }));
            f.set(f.get() + 1);
        });

        adapter.fail.set(true);
        let menu = window(&manager, "main").build().unwrap();
        assert_eq!(manager.open(ALICE, &menu, 0).unwrap(), None);
        assert_eq!(failures.get(), 1);
        assert!(manager.session(ALICE).is_none());
    }

    #[test]
    fn test_missing_adapter_is_an_error() {
        let (manager, _adapter) = setup();
        let failures = Rc::new(Counter::new(0));
        let f = failures.clone();
        manager.set_failure_handler(move |_, _, _| f.set(f.get() + 1));

        let menu = Window::builder()
            .id("hopper")
            .kind(MenuType::Hopper)
            .size(1, 5)
            .manager(&manager)
            .build()
            .unwrap();
        let result = manager.open(ALICE, &menu, 0);

        assert!(matches!(result, Err(MenuError::NoAdapter(MenuType::Hopper))));
        assert_eq!(failures.get(), 1);
        assert!(manager.session(ALICE).is_none());
    }

    #[test]
    fn test_latest_adapter_wins() {
        let (manager, first) = setup();
        let second = adapter_for(&[MenuType::Chest]);
        manager.register_adapter(second.clone());

        let menu = window(&manager, "main").build().unwrap();
        menu.open(ALICE).unwrap();
        assert_eq!(first.open_count(), 0);
        assert_eq!(second.open_count(), 1);
    }

    #[test]
    fn test_tick_snapshot_survives_mid_sweep_close() {
        let (manager, _adapter) = setup();
        let updates = Rc::new(Counter::new(0));
        let u = updates.clone();
        let menu = window(&manager, "mutual")
            .provider(Updating::new(move |contents, manager| {
                u.set(u.get() + 1);
                let other = if contents.user() == ALICE { BOB } else { ALICE };
                manager.close(other);
                Ok(())
            }))
            .build()
            .unwrap();

        menu.open(ALICE).unwrap();
        menu.open(BOB).unwrap();
        manager.tick();

        // Whoever ran first closed the other before its turn
        assert_eq!(updates.get(), 1);
        assert_eq!(manager.active_users().len(), 1);
    }

    #[test]
    fn test_tick_continues_after_update_error() {
        let (manager, _adapter) = setup();
        let updates = Rc::new(Counter::new(0));
        let u = updates.clone();
        let menu = window(&manager, "flaky")
            .provider(Updating::new(move |contents, _| {
                u.set(u.get() + 1);
                if contents.user() == ALICE {
                    bail!("stale data");
                }
                contents.set((0, 0), Some(Cell::display(7)));
                Ok(())
            }))
            .build()
            .unwrap();

        menu.open(ALICE).unwrap();
        menu.open(BOB).unwrap();
        manager.tick();

        assert_eq!(updates.get(), 2);
        let bob = manager.contents(BOB).unwrap();
        assert_eq!(bob.borrow().get((0, 0)).and_then(|c| c.item), Some(7));
        assert_eq!(manager.active_users(), vec![ALICE, BOB]);
    }

    #[test]
    fn test_host_close_of_closeable_menu() {
        let (manager, adapter) = setup();
        let menu = window(&manager, "main").build().unwrap();
        menu.open(ALICE).unwrap();

        let event = CloseEvent {
            user: ALICE,
            surface: Some(SurfaceId(1)),
        };
        assert!(manager.host_closed(&event));
        assert!(manager.session(ALICE).is_none());
        // The host already took it down
        assert!(!adapter.surface(0).closed.get());
    }

    #[test]
    fn test_host_open_only_reaches_committed_sessions() {
        let (manager, _adapter) = setup();
        let log = recorder();
        let during_init = Rc::new(Counter::new(true));
        let (l, d) = (log.clone(), during_init.clone());
        let menu = window(&manager, "main")
            .listener(Listener::on_open(move |event, _| l.borrow_mut().push(event.surface.to_string())))
            .init_with(move |_, manager| {
                let event = OpenEvent {
                    user: ALICE,
                    surface: SurfaceId(1),
                };
                d.set(manager.host_opened(&event));
                Ok(())
            })
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        assert!(!during_init.get());
        assert!(log.borrow().is_empty());

        let stale = OpenEvent {
            user: ALICE,
            surface: SurfaceId(5),
        };
        assert!(!manager.host_opened(&stale));
        let current = OpenEvent {
            user: ALICE,
            surface: SurfaceId(1),
        };
        assert!(manager.host_opened(&current));
        assert_eq!(*log.borrow(), vec!["surface#1"]);
    }

    #[test]
    fn test_host_close_of_stale_surface_is_ignored() {
        let (manager, _adapter) = setup();
        let menu = window(&manager, "main").build().unwrap();
        menu.open(ALICE).unwrap();

        let event = CloseEvent {
            user: ALICE,
            surface: Some(SurfaceId(99)),
        };
        assert!(!manager.host_closed(&event));
        assert!(manager.window(ALICE).is_some());
    }

    #[test]
    fn test_non_closeable_menu_reopens_on_tick() {
        let (manager, adapter) = setup();
        let menu = window(&manager, "locked").closeable(false).build().unwrap();
        menu.open(ALICE).unwrap();
        let session = manager.session(ALICE).unwrap().id;

        manager.host_closed(&CloseEvent {
            user: ALICE,
            surface: Some(SurfaceId(1)),
        });
        assert!(manager.is_current(ALICE, session));

        manager.tick();
        assert_eq!(adapter.open_count(), 2);
        assert_eq!(manager.surface(ALICE).map(|s| s.id()), Some(SurfaceId(2)));
        assert!(manager.is_current(ALICE, session));

        let contents = manager.contents(ALICE).unwrap();
        contents.borrow_mut().set((1, 2), Some(Cell::display(3)));
        assert_eq!(*adapter.surface(1).writes.borrow(), vec![(5, Some(3))]);
    }

    #[test]
    fn test_user_left_drops_session() {
        let (manager, adapter) = setup();
        let log = recorder();
        let l = log.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_user_left(move |event, _| l.borrow_mut().push(event.user.to_string())))
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();

        assert!(manager.user_left(&UserLeft { user: ALICE }));
        assert!(!manager.user_left(&UserLeft { user: ALICE }));
        assert_eq!(*log.borrow(), vec!["user#1"]);
        assert!(manager.session(ALICE).is_none());
        assert!(!adapter.surface(0).closed.get());
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let (manager, adapter) = setup();
        let events = recorder();
        let e = events.clone();
        let l = events.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_shutdown(move |_, _| e.borrow_mut().push("shutdown".into())))
            .listener(Listener::on_close(move |_, _| l.borrow_mut().push("close".into())))
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        menu.open(BOB).unwrap();

        manager.shutdown();

        assert_eq!(*events.borrow(), vec!["shutdown", "close", "shutdown", "close"]);
        assert!(manager.active_users().is_empty());
        assert!(adapter.surface(0).closed.get());
        assert!(adapter.surface(1).closed.get());
    }

    #[test]
    fn test_open_parent() {
        let (manager, _adapter) = setup();
        let root = window(&manager, "root").build().unwrap();
        let child = window(&manager, "child").parent(Some(root.clone())).build().unwrap();

        child.open(ALICE).unwrap();
        manager.open_parent(ALICE).unwrap();
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &root)));

        // Root has no parent: nothing changes
        assert_eq!(manager.open_parent(ALICE).unwrap(), None);
        assert!(manager.window(ALICE).is_some());
    }

    #[test]
    fn test_opened_users_per_window() {
        let (manager, _adapter) = setup();
        let shop = window(&manager, "shop").build().unwrap();
        let bank = window(&manager, "bank").build().unwrap();

        shop.open(BOB).unwrap();
        bank.open(ALICE).unwrap();
        shop.open(ALICE).unwrap();

        assert_eq!(shop.opened_users(), vec![ALICE, BOB]);
        assert!(bank.opened_users().is_empty());
    }
}
