//! Raw interaction events delivered by the host
//!
//! Click and drag events carry a suppression flag. Cancelling one only sets
//! the flag; the host reads it afterwards and decides what to undo.

use bitflags::bitflags;
use crossterm::event::KeyModifiers;

use crate::core::UserId;
use crate::ui::SurfaceId;

bitflags! {
    /// Modifier keys held during a click
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// What the host classified a click as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickAction {
    /// Take the whole slot
    #[default]
    Pickup,
    /// Take half of the slot
    PickupHalf,
    /// Put the held payload down
    Place,
    /// Exchange the held payload with the slot
    Swap,
    /// Shift-click transfer to the other surface
    MoveToOther,
    Drop,
    /// Gather every matching payload onto the cursor
    CollectToCursor,
    /// The host decided nothing happens
    Nothing,
}

/// Click on a slot of a surface
#[derive(Debug, Clone)]
pub struct ClickEvent {
    /// Surface that was clicked
    pub surface: SurfaceId,
    pub user: UserId,
    /// Row-major raw slot index
    pub slot: usize,
    pub action: ClickAction,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    cancelled: bool,
}

impl ClickEvent {
    pub fn new(surface: SurfaceId, user: UserId, slot: usize, action: ClickAction) -> Self {
        Self {
            surface,
            user,
            slot,
            action,
            button: MouseButton::default(),
            modifiers: Modifiers::empty(),
            cancelled: false,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Drag spreading a payload over several raw slots
#[derive(Debug, Clone)]
pub struct DragEvent {
    pub user: UserId,
    /// Raw slot indices touched by the drag
    pub slots: Vec<usize>,
    cancelled: bool,
}

impl DragEvent {
    pub fn new(user: UserId, slots: Vec<usize>) -> Self {
        Self {
            user,
            slots,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A surface was shown to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenEvent {
    pub user: UserId,
    pub surface: SurfaceId,
}

/// A surface was closed. Engine-synthesized closes of a session that never
/// reached the screen carry no surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseEvent {
    pub user: UserId,
    pub surface: Option<SurfaceId>,
}

/// The user disconnected from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserLeft {
    pub user: UserId,
}

/// The host is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostShutdown;

/// Any raw host event
#[derive(Debug, Clone)]
pub enum HostEvent {
    Click(ClickEvent),
    Drag(DragEvent),
    Open(OpenEvent),
    Close(CloseEvent),
    UserLeft(UserLeft),
    Shutdown(HostShutdown),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_from_crossterm() {
        assert_eq!(Modifiers::from(KeyModifiers::NONE), Modifiers::empty());
        assert_eq!(
            Modifiers::from(KeyModifiers::SHIFT | KeyModifiers::CONTROL),
            Modifiers::SHIFT | Modifiers::CTRL
        );
    }

    #[test]
    fn test_cancellation_flag() {
        let mut event = ClickEvent::new(SurfaceId(1), UserId(1), 0, ClickAction::Pickup);
        assert!(!event.is_cancelled());
        event.cancel();
        assert!(event.is_cancelled());
        event.set_cancelled(false);
        assert!(!event.is_cancelled());
    }
}
