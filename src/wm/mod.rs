//! Menu Manager - menu descriptors and the per-user session registry.
//!
//! This module provides the session lifecycle:
//!
//! - **window**: Immutable `Window` descriptors, their builder and `MenuType`
//! - **listener**: Typed lifecycle/interaction listeners grouped by kind
//! - **manager**: `MenuManager` registry (open, close, refresh, shutdown)
//!
//! # Module Hierarchy
//!
//! ```text
//! wm/
//! ├── mod.rs       - Module exports
//! ├── manager.rs   - MenuManager (session registry)
//! ├── window.rs    - Window, WindowBuilder, ContentProvider
//! └── listener.rs  - Listener, ListenerSet
//! ```

pub mod listener;
pub mod manager;
pub mod window;

pub use listener::{EventKind, Listener, ListenerSet};
pub use manager::{FailureHandler, MenuManager, Phase, Session, SessionId};
pub use window::{ContentProvider, MenuType, Window, WindowBuilder};
