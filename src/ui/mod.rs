//! Host-facing side of the engine.
//!
//! This module provides everything that touches the host:
//!
//! - **adapter**: `DisplayAdapter` / `Surface` seam to the host's screen
//! - **event**: raw click, drag and lifecycle events with `Modifiers`
//! - **router**: `EventRouter` turning host events into session actions
//! - **terminal**: crossterm adapter and renderer for `Label` menus
//!
//! # Event Flow
//!
//! ```text
//! host input ─→ HostEvent ─→ EventRouter ─→ listeners ─→ cell handler
//!                                 │
//!                                 └─→ MenuManager (close, user left, shutdown)
//! ```

pub mod adapter;
pub mod event;
pub mod router;
pub mod terminal;

pub use adapter::{DisplayAdapter, Surface, SurfaceId, SurfaceLink};
pub use event::{
    ClickAction, ClickEvent, CloseEvent, DragEvent, HostEvent, HostShutdown, Modifiers, MouseButton, OpenEvent,
    UserLeft,
};
pub use router::{Dispatch, EventRouter};
pub use terminal::{Label, TerminalAdapter, TerminalRenderer};
