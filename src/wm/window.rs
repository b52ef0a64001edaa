//! Menu descriptors and their builder

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Contents, UserId};
use crate::error::{MenuError, Result};
use crate::ui::SurfaceId;
use crate::wm::listener::{Listener, ListenerSet};
use crate::wm::manager::{MenuManager, WeakManager};

/// Kind of host surface a menu is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuType {
    #[default]
    Chest,
    Dispenser,
    Dropper,
    Hopper,
    Furnace,
    Workbench,
    Anvil,
    Brewing,
    Enchanting,
}

impl MenuType {
    pub fn name(&self) -> &'static str {
        match self {
            MenuType::Chest => "chest",
            MenuType::Dispenser => "dispenser",
            MenuType::Dropper => "dropper",
            MenuType::Hopper => "hopper",
            MenuType::Furnace => "furnace",
            MenuType::Workbench => "workbench",
            MenuType::Anvil => "anvil",
            MenuType::Brewing => "brewing",
            MenuType::Enchanting => "enchanting",
        }
    }

    /// Natural (rows, columns) of the surface kind
    pub fn default_dimensions(&self) -> (usize, usize) {
        match self {
            MenuType::Chest => (3, 9),
            MenuType::Dispenser | MenuType::Dropper => (3, 3),
            MenuType::Hopper | MenuType::Brewing => (1, 5),
            MenuType::Furnace | MenuType::Anvil => (1, 3),
            MenuType::Workbench => (2, 5),
            MenuType::Enchanting => (1, 2),
        }
    }
}

impl fmt::Display for MenuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fills and refreshes a session's grid.
///
/// Closures of the right shape are providers too (with a no-op `update`).
pub trait ContentProvider<T> {
    /// Populate a fresh grid. Runs once per open.
    fn init(&self, contents: &mut Contents<T>, manager: &MenuManager<T>) -> anyhow::Result<()>;

    /// Periodic refresh while the session is open
    fn update(&self, _contents: &mut Contents<T>, _manager: &MenuManager<T>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<T, F> ContentProvider<T> for F
where
    F: Fn(&mut Contents<T>, &MenuManager<T>) -> anyhow::Result<()>,
{
    fn init(&self, contents: &mut Contents<T>, manager: &MenuManager<T>) -> anyhow::Result<()> {
        self(contents, manager)
    }
}

/// Provider leaving the grid empty
struct EmptyProvider;

impl<T> ContentProvider<T> for EmptyProvider {
    fn init(&self, _contents: &mut Contents<T>, _manager: &MenuManager<T>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Immutable description of a menu, shared by all users viewing it
pub struct Window<T> {
    id: String,
    title: String,
    kind: MenuType,
    rows: usize,
    columns: usize,
    closeable: bool,
    parent: Option<Rc<Window<T>>>,
    provider: Rc<dyn ContentProvider<T>>,
    listeners: ListenerSet<T>,
    manager: WeakManager<T>,
}

impl<T> Window<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> MenuType {
        self.kind
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// (rows, columns)
    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn is_closeable(&self) -> bool {
        self.closeable
    }

    pub fn parent(&self) -> Option<&Rc<Window<T>>> {
        self.parent.as_ref()
    }

    pub fn provider(&self) -> &Rc<dyn ContentProvider<T>> {
        &self.provider
    }

    pub fn listeners(&self) -> &ListenerSet<T> {
        &self.listeners
    }
}

impl<T: 'static> Window<T> {
    pub fn builder() -> WindowBuilder<T> {
        WindowBuilder::new()
    }

    /// Manager this window was built against
    pub fn manager(&self) -> Result<MenuManager<T>> {
        MenuManager::upgrade(&self.manager).ok_or_else(|| MenuError::RegistryUnbound(self.id.clone()))
    }

    /// Open on the first page
    pub fn open(self: &Rc<Self>, user: UserId) -> Result<Option<SurfaceId>> {
        self.open_page(user, 0)
    }

    /// Open for `user` with pagination seeded to `page`
    pub fn open_page(self: &Rc<Self>, user: UserId, page: usize) -> Result<Option<SurfaceId>> {
        self.manager()?.open(user, self, page)
    }

    /// Close this window for `user` if it's what they are looking at
    pub fn close(&self, user: UserId) -> Result<()> {
        let manager = self.manager()?;
        let showing = manager.window(user).map_or(false, |w| std::ptr::eq(Rc::as_ptr(&w), self));
        if showing {
            manager.close(user);
        } else {
            debug!("Window '{}' is not open for {}", self.id, user);
        }
        Ok(())
    }

    /// Users currently viewing this window
    pub fn opened_users(&self) -> Vec<UserId> {
        MenuManager::upgrade(&self.manager)
            .map(|manager| manager.opened_users(self))
            .unwrap_or_default()
    }
}

impl<T> fmt::Debug for Window<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("closeable", &self.closeable)
            .field("parent", &self.parent.as_ref().map(|p| p.id.clone()))
            .finish()
    }
}

/// Builder for [`Window`]
pub struct WindowBuilder<T> {
    id: String,
    title: String,
    kind: MenuType,
    size: Option<(usize, usize)>,
    closeable: bool,
    parent: Option<Rc<Window<T>>>,
    provider: Option<Rc<dyn ContentProvider<T>>>,
    listeners: ListenerSet<T>,
    manager: Option<MenuManager<T>>,
}

impl<T: 'static> WindowBuilder<T> {
    fn new() -> Self {
        Self {
            id: "unknown".to_string(),
            title: String::new(),
            kind: MenuType::default(),
            size: None,
            closeable: true,
            parent: None,
            provider: None,
            listeners: ListenerSet::new(),
            manager: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn kind(mut self, kind: MenuType) -> Self {
        self.kind = kind;
        self
    }

    pub fn size(mut self, rows: usize, columns: usize) -> Self {
        self.size = Some((rows, columns));
        self
    }

    pub fn closeable(mut self, closeable: bool) -> Self {
        self.closeable = closeable;
        self
    }

    pub fn parent(mut self, parent: Option<Rc<Window<T>>>) -> Self {
        self.parent = parent;
        self
    }

    pub fn provider(mut self, provider: impl ContentProvider<T> + 'static) -> Self {
        self.provider = Some(Rc::new(provider));
        self
    }

    /// Closure provider with no refresh
    pub fn init_with<F>(self, init: F) -> Self
    where
        F: Fn(&mut Contents<T>, &MenuManager<T>) -> anyhow::Result<()> + 'static,
    {
        self.provider(init)
    }

    pub fn listener(mut self, listener: Listener<T>) -> Self {
        self.listeners.add(listener);
        self
    }

    pub fn manager(mut self, manager: &MenuManager<T>) -> Self {
        self.manager = Some(manager.clone());
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// Without an explicit size the manager's default for the menu type is
    /// used, which needs an adapter (or a configured size) for that type.
    pub fn build(self) -> Result<Rc<Window<T>>> {
        let manager = self.manager.ok_or_else(|| MenuError::RegistryUnbound(self.id.clone()))?;
        let (rows, columns) = match self.size {
            Some(size) => size,
            None => manager.default_dimensions(self.kind)?,
        };
        if rows == 0 || columns == 0 {
            return Err(MenuError::InvalidDimensions { rows, columns });
        }

        Ok(Rc::new(Window {
            id: self.id,
            title: self.title,
            kind: self.kind,
            rows,
            columns,
            closeable: self.closeable,
            parent: self.parent,
            provider: self.provider.unwrap_or_else(|| Rc::new(EmptyProvider)),
            listeners: self.listeners,
            manager: manager.downgrade(),
        }))
    }
}
